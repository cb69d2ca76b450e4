use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use scout_core::chat::{ChatPanel, TranscriptEvent, TurnOutcome};
use scout_core::domain::chat::MessageId;

const HELP: &str = "Commands: /think toggles deep analysis, /quit exits.";

/// Line-oriented chat loop over stdin. Returns when stdin closes or on `/quit`.
pub async fn run(panel: ChatPanel) -> anyhow::Result<()> {
    let mut out = tokio::io::stdout();
    let mut events = panel.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let snapshot = panel.snapshot().await;
    for message in &snapshot.transcript {
        say(&mut out, &format!("assistant> {}\n", message.text)).await?;
    }
    say(&mut out, &format!("{HELP}\n")).await?;
    prompt(&mut out, snapshot.thinking_mode).await?;

    while let Some(line) = lines.next_line().await.context("read stdin failed")? {
        match line.trim() {
            "/quit" | "/exit" => break,
            "/think" => {
                let on = panel.toggle_thinking_mode().await;
                let state = if on { "on" } else { "off" };
                say(&mut out, &format!("deep analysis {state}\n")).await?;
            }
            "" => {}
            _ => match panel.begin(&line).await {
                Some(turn) => {
                    let reply_id = turn.reply_id;
                    let driver = panel.clone();
                    let mut task = tokio::spawn(async move { driver.drive(turn).await });

                    say(&mut out, "assistant> ").await?;
                    let mut streamed = false;
                    let outcome = loop {
                        tokio::select! {
                            event = events.recv() => match event {
                                Ok(event) => {
                                    render(&mut out, &panel, reply_id, event, &mut streamed).await?
                                }
                                Err(RecvError::Lagged(skipped)) => {
                                    tracing::warn!(skipped, "transcript events dropped");
                                }
                                Err(RecvError::Closed) => {}
                            },
                            joined = &mut task => break joined.context("chat turn task failed")?,
                        }
                    };
                    loop {
                        match events.try_recv() {
                            Ok(event) => {
                                render(&mut out, &panel, reply_id, event, &mut streamed).await?
                            }
                            Err(TryRecvError::Lagged(_)) => continue,
                            Err(_) => break,
                        }
                    }
                    say(&mut out, "\n").await?;
                    tracing::debug!(%reply_id, ?outcome, "turn rendered");
                    if outcome == TurnOutcome::Cancelled {
                        break;
                    }
                }
                None => say(&mut out, "a reply is still pending\n").await?,
            },
        }
        prompt(&mut out, panel.snapshot().await.thinking_mode).await?;
    }

    panel.dispose();
    Ok(())
}

/// `streamed` records whether chunks are already on screen, so a replacement
/// starts on its own line.
async fn render(
    out: &mut Stdout,
    panel: &ChatPanel,
    reply_id: MessageId,
    event: TranscriptEvent,
    streamed: &mut bool,
) -> anyhow::Result<()> {
    match event {
        TranscriptEvent::Chunk { reply_id: id, text } if id == reply_id => {
            *streamed = true;
            say(out, &text).await
        }
        TranscriptEvent::Replaced { reply_id: id } | TranscriptEvent::Failed { reply_id: id }
            if id == reply_id =>
        {
            let snapshot = panel.snapshot().await;
            let Some(message) = snapshot.transcript.iter().find(|m| m.id == reply_id) else {
                return Ok(());
            };
            let text = replacement_text(*streamed, &message.text);
            *streamed = false;
            say(out, &text).await
        }
        _ => Ok(()),
    }
}

fn replacement_text(streamed: bool, text: &str) -> String {
    if streamed {
        format!("\n[reply replaced]\nassistant> {text}")
    } else {
        text.to_string()
    }
}

async fn prompt(out: &mut Stdout, thinking: bool) -> anyhow::Result<()> {
    let marker = if thinking { "you (deep)> " } else { "you> " };
    say(out, marker).await
}

async fn say(out: &mut Stdout, text: &str) -> anyhow::Result<()> {
    out.write_all(text.as_bytes())
        .await
        .context("write stdout failed")?;
    out.flush().await.context("flush stdout failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::llm::prompt::FALLBACK_ERROR;

    #[test]
    fn replacement_after_streamed_chunks_starts_a_new_line() {
        let text = replacement_text(true, FALLBACK_ERROR);
        assert!(text.starts_with('\n'));
        assert!(text.ends_with(&format!("assistant> {FALLBACK_ERROR}")));
    }

    #[test]
    fn replacement_without_chunks_prints_in_place() {
        assert_eq!(replacement_text(false, "Report body."), "Report body.");
    }
}
