//! Line-oriented session loop
//!
//! One utterance per line. Ctrl-C during a turn requests a cooperative stop
//! after the current tool round; a second Ctrl-C while one is pending
//! hard-stops the process. At the idle prompt Ctrl-C just points at /quit.

use std::io::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::AsyncBufReadExt;

use talos_core::tools::builtin_registry;
use talos_core::{Agent, AgentEvent, AnthropicClient, CancelToken, Config};

/// What a Ctrl-C should do given the session state.
#[derive(Debug, PartialEq, Eq)]
enum CtrlCAction {
    /// No turn running: don't arm the token, just hint at /quit.
    Hint,
    /// Turn in flight: request a cooperative stop.
    Cancel,
    /// Second press while a stop is pending: exit now.
    HardStop,
}

fn ctrl_c_action(turn_in_flight: bool, cancel_pending: bool) -> CtrlCAction {
    if !turn_in_flight {
        CtrlCAction::Hint
    } else if cancel_pending {
        CtrlCAction::HardStop
    } else {
        CtrlCAction::Cancel
    }
}

pub async fn run(config: Config, system_prompt: String) -> anyhow::Result<()> {
    let client = Arc::new(AnthropicClient::new(&config, system_prompt));
    let model = client.model().to_string();
    let registry = builtin_registry(&config);
    let mut agent = Agent::new(client, registry);
    let cancel = CancelToken::new();
    let turn_in_flight = Arc::new(AtomicBool::new(false));

    let signal_token = cancel.clone();
    let signal_busy = Arc::clone(&turn_in_flight);
    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            match ctrl_c_action(
                signal_busy.load(Ordering::Acquire),
                signal_token.is_cancelled(),
            ) {
                CtrlCAction::Hint => eprintln!("\n(use /quit to exit)"),
                CtrlCAction::Cancel => {
                    signal_token.cancel();
                    eprintln!("\n(stopping after the current round - ctrl-c again to force quit)");
                }
                CtrlCAction::HardStop => {
                    eprintln!();
                    std::process::exit(130);
                }
            }
        }
    });

    println!("talos | {} | /clear resets, /quit exits", model);

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim().to_string();

        match line.as_str() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                agent.clear();
                println!("(conversation cleared)");
                continue;
            }
            "/usage" => {
                let usage = agent.usage();
                println!(
                    "tokens: {} in / {} out",
                    usage.input_tokens, usage.output_tokens
                );
                continue;
            }
            _ => {}
        }

        turn_in_flight.store(true, Ordering::Release);
        let result = agent
            .run_turn(&line, &cancel, |event| match event {
                AgentEvent::Thinking => {}
                AgentEvent::Text(text) => println!("{}", text),
                AgentEvent::ToolCall { name, preview } => println!("🔧 {}: {}", name, preview),
                AgentEvent::ToolResult { .. } => {}
                AgentEvent::Response(text) => {
                    if !text.is_empty() {
                        println!("\n{}", text);
                    }
                }
                // the Err below carries the message
                AgentEvent::Error(_) => {}
            })
            .await;
        turn_in_flight.store(false, Ordering::Release);

        if let Err(e) = result {
            eprintln!("❌ {}", e);
        }

        // Don't let a stale flag turn the next ctrl-c into a hard stop.
        cancel.reset();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctrl_c_at_idle_prompt_only_hints() {
        assert_eq!(ctrl_c_action(false, false), CtrlCAction::Hint);
        // even a stale pending flag must not hard-stop from idle
        assert_eq!(ctrl_c_action(false, true), CtrlCAction::Hint);
    }

    #[test]
    fn test_ctrl_c_during_turn_cancels_then_hard_stops() {
        assert_eq!(ctrl_c_action(true, false), CtrlCAction::Cancel);
        assert_eq!(ctrl_c_action(true, true), CtrlCAction::HardStop);
    }
}
