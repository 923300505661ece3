//! Macros for ergonomic state machine construction.

/// Declare a state key enum and its `StateKey` implementation.
///
/// # Example
///
/// ```
/// use hsmind::state_keys;
/// use hsmind::core::StateKey;
///
/// state_keys! {
///     pub enum Dhcp {
///         Running,
///         Stopped,
///         Bound,
///     }
/// }
///
/// assert_eq!(Dhcp::Bound.name(), "Bound");
/// ```
#[macro_export]
macro_rules! state_keys {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::StateKey for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }
    };
}
