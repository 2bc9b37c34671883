use anyhow::Result;
use std::io::{self, BufRead, Write};

use mealplan_core::chat::{ChatError, ChatMessage, ChatProvider};
use mealplan_core::service::MealPlanService;

/// Conversation kept in memory for the length of one `chat` invocation.
#[derive(Debug, Default)]
pub(crate) struct ChatSession {
    history: Vec<ChatMessage>,
}

impl ChatSession {
    /// Send one user turn. A failed turn is removed again so the user can
    /// retry without it lingering in the history.
    pub(crate) fn send(
        &mut self,
        svc: &MealPlanService,
        provider: &dyn ChatProvider,
        prompt: &str,
    ) -> Result<String, ChatError> {
        self.history.push(ChatMessage::user(prompt));
        match svc.chat(provider, &self.history) {
            Ok(reply) => {
                self.history.push(ChatMessage::assistant(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                self.history.pop();
                Err(e)
            }
        }
    }

    pub(crate) fn history(&self) -> &[ChatMessage] {
        &self.history
    }
}

fn report(err: &ChatError, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::json!({ "error": err.to_string(), "hint": err.guidance() })
        );
    } else {
        eprintln!("{err}");
        eprintln!("{}", err.guidance());
    }
}

/// The provider blocks on HTTP, so each turn runs on a blocking-capable
/// worker thread.
fn send_blocking(
    session: &mut ChatSession,
    svc: &MealPlanService,
    provider: &dyn ChatProvider,
    prompt: &str,
) -> Result<String, ChatError> {
    tokio::task::block_in_place(|| session.send(svc, provider, prompt))
}

pub(crate) fn cmd_chat(
    svc: &MealPlanService,
    provider: &dyn ChatProvider,
    prompt: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut session = ChatSession::default();

    if let Some(prompt) = prompt {
        return match send_blocking(&mut session, svc, provider, prompt) {
            Ok(reply) => {
                if json {
                    println!("{}", serde_json::json!({ "reply": reply }));
                } else {
                    println!("{reply}");
                }
                Ok(())
            }
            Err(e) => {
                report(&e, json);
                std::process::exit(1);
            }
        };
    }

    eprintln!("Ask for recipes, plan meals, or get inspired. Type 'exit' or press Ctrl-D to leave.");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        eprint!("> ");
        io::stderr().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if matches!(prompt, "exit" | "quit") {
            break;
        }

        match send_blocking(&mut session, svc, provider, prompt) {
            Ok(reply) if json => println!("{}", serde_json::json!({ "reply": reply })),
            Ok(reply) => println!("\n{reply}\n"),
            Err(e) => report(&e, json),
        }
    }
    tracing::debug!(turns = session.history().len(), "chat session ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedProvider {
        replies: Mutex<Vec<Result<String, ChatError>>>,
        history_lens: Mutex<Vec<usize>>,
    }

    impl ScriptedProvider {
        fn new(mut replies: Vec<Result<String, ChatError>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                history_lens: Mutex::new(Vec::new()),
            }
        }
    }

    impl ChatProvider for ScriptedProvider {
        fn complete(&self, history: &[ChatMessage], _context: &str) -> Result<String, ChatError> {
            self.history_lens.lock().unwrap().push(history.len());
            self.replies.lock().unwrap().pop().unwrap()
        }
    }

    #[test]
    fn test_session_keeps_history() {
        let svc = MealPlanService::new_in_memory().unwrap();
        let provider = ScriptedProvider::new(vec![
            Ok("Try shakshuka.".to_string()),
            Ok("About 25 minutes.".to_string()),
        ]);
        let mut session = ChatSession::default();

        session.send(&svc, &provider, "Breakfast idea?").unwrap();
        let reply = session.send(&svc, &provider, "How long?").unwrap();

        assert_eq!(reply, "About 25 minutes.");
        assert_eq!(session.history().len(), 4);
        assert_eq!(*provider.history_lens.lock().unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_failed_turn_is_dropped() {
        let svc = MealPlanService::new_in_memory().unwrap();
        let provider = ScriptedProvider::new(vec![
            Err(ChatError::Transport {
                status: Some(500),
                message: "boom".to_string(),
            }),
            Ok("Pasta.".to_string()),
        ]);
        let mut session = ChatSession::default();

        assert!(session.send(&svc, &provider, "Dinner?").is_err());
        assert!(session.history().is_empty());

        session.send(&svc, &provider, "Dinner?").unwrap();
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[1], ChatMessage::assistant("Pasta."));
    }
}
