//! Connection Machine
//!
//! This example drives a small network link through a hierarchy of states.
//!
//! Key concepts:
//! - Nested states (Running -> Disconnected | Connecting | Connected)
//! - Messages bubbling from a leaf up to its ancestors
//! - Deferring a message until a transition completes
//! - Halting on a fatal error and dumping recent history
//!
//! Run with: RUST_LOG=hsmind=debug cargo run --example connection_machine

use hsmind::core::{Disposition, Message, State};
use hsmind::engine::{Context, MachineHooks};
use hsmind::{state_keys, MachineBuilder};
use tracing_subscriber::EnvFilter;

state_keys! {
    enum Link {
        Running,
        Disconnected,
        Connecting,
        Connected,
    }
}

const CMD_CONNECT: i32 = 1;
const EVENT_CONNECTED: i32 = 2;
const CMD_SEND: i32 = 3;
const CMD_DISCONNECT: i32 = 4;
const EVENT_FATAL: i32 = 5;

// Environment: what the states act on
#[derive(Default)]
struct Socket {
    sent: Vec<String>,
    attempts: u32,
}

impl MachineHooks for Socket {
    fn unhandled_message(&mut self, msg: &Message) {
        println!("  unhandled message {}", msg.what);
    }

    fn halted_process_message(&mut self, msg: &Message) {
        println!("  halted, ignoring message {}", msg.what);
    }

    fn on_halting(&mut self) {
        println!("  link halted after {} attempts", self.attempts);
    }

    fn on_quitting(&mut self) {
        println!("  link shut down, {} payloads sent", self.sent.len());
    }

    fn what_to_string(&self, what: i32) -> Option<String> {
        let name = match what {
            CMD_CONNECT => "CMD_CONNECT",
            EVENT_CONNECTED => "EVENT_CONNECTED",
            CMD_SEND => "CMD_SEND",
            CMD_DISCONNECT => "CMD_DISCONNECT",
            EVENT_FATAL => "EVENT_FATAL",
            _ => return None,
        };
        Some(name.to_string())
    }

    fn log_rec_string(&self, msg: &Message) -> String {
        msg.payload::<String>().cloned().unwrap_or_default()
    }
}

struct Running;

impl State<Link, Socket> for Running {
    fn process_message(
        &mut self,
        msg: &Message,
        ctx: &mut Context<'_, Link, Socket>,
    ) -> Disposition {
        match msg.what {
            CMD_DISCONNECT => ctx.transition_to(Link::Disconnected),
            EVENT_FATAL => ctx.transition_to_halting(),
            _ => return Disposition::NotHandled,
        }
        Disposition::Handled
    }
}

struct Disconnected;

impl State<Link, Socket> for Disconnected {
    fn enter(&mut self, _ctx: &mut Context<'_, Link, Socket>) {
        println!("  [Disconnected] enter");
    }

    fn process_message(
        &mut self,
        msg: &Message,
        ctx: &mut Context<'_, Link, Socket>,
    ) -> Disposition {
        if msg.what != CMD_CONNECT {
            return Disposition::NotHandled;
        }
        ctx.transition_to(Link::Connecting);
        Disposition::Handled
    }
}

struct Connecting;

impl State<Link, Socket> for Connecting {
    fn enter(&mut self, ctx: &mut Context<'_, Link, Socket>) {
        ctx.env_mut().attempts += 1;
        println!("  [Connecting] attempt {}", ctx.env().attempts);
    }

    fn process_message(
        &mut self,
        msg: &Message,
        ctx: &mut Context<'_, Link, Socket>,
    ) -> Disposition {
        match msg.what {
            EVENT_CONNECTED => ctx.transition_to(Link::Connected),
            CMD_SEND => {
                println!("  [Connecting] deferring send");
                ctx.defer_message(msg);
            }
            _ => return Disposition::NotHandled,
        }
        Disposition::Handled
    }
}

struct Connected;

impl State<Link, Socket> for Connected {
    fn enter(&mut self, _ctx: &mut Context<'_, Link, Socket>) {
        println!("  [Connected] enter");
    }

    fn exit(&mut self, _ctx: &mut Context<'_, Link, Socket>) {
        println!("  [Connected] exit");
    }

    fn process_message(
        &mut self,
        msg: &Message,
        ctx: &mut Context<'_, Link, Socket>,
    ) -> Disposition {
        if msg.what != CMD_SEND {
            return Disposition::NotHandled;
        }
        let payload = msg.payload::<String>().cloned().unwrap_or_default();
        println!("  [Connected] sending {payload:?}");
        ctx.env_mut().sent.push(payload);
        Disposition::Handled
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    println!("=== Connection Machine ===\n");

    let mut machine = MachineBuilder::new("link", Socket::default())
        .state(Link::Running, Running)
        .child(Link::Disconnected, Disconnected, Link::Running)
        .child(Link::Connecting, Connecting, Link::Running)
        .child(Link::Connected, Connected, Link::Running)
        .initial(Link::Disconnected)
        .start()?;

    println!("\nConnecting and sending before the link is up:");
    machine.send_message(Message::new(CMD_CONNECT));
    machine.send_message(Message::new(CMD_SEND).with_obj("hello".to_string()));
    machine.send_message(Message::new(EVENT_CONNECTED));
    machine.run_pending()?;

    println!("\nDisconnecting through the parent state:");
    machine.send_message(Message::new(CMD_DISCONNECT));
    machine.send_message(Message::new(CMD_CONNECT));
    machine.send_message(Message::new(EVENT_FATAL));
    machine.send_message(Message::new(CMD_SEND).with_obj("lost".to_string()));
    machine.run_pending()?;

    println!("\nShutting down:");
    machine.quit();
    machine.run_pending()?;

    println!("\n{}", machine.dump());
    Ok(())
}
