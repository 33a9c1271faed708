//! Force-remove command orchestration.
#![allow(dead_code)]
//!
//! One flow shared by both invocation styles: guard the argument, short
//! circuit on an empty queue, resolve the query, disambiguate if needed,
//! then bulk-remove by owner and report. The transport only differs in how
//! replies reach the chat, which is what `ResponseSink` abstracts.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

use super::disambig::{SelectOutcome, SelectRegistry};
use super::queue::TrackQueue;
use super::roster::{Member, Roster};

/// How the command reached us.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InvokeStyle {
    /// Plain text command; the raw argument may be empty.
    Direct,
    /// Callback-driven invocation carrying a structured, non-empty argument.
    Deferred,
}

/// Machine-checkable class of a reply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplyKind {
    MissingArgument,
    QueueEmpty,
    NotFound,
    /// Warning: the target had nothing queued.
    NothingQueued,
    /// Success: tracks were removed.
    Removed,
    Cancelled,
    Internal,
}

/// A user-facing reply with its class.
#[derive(Debug, Clone)]
pub struct Reply {
    pub kind: ReplyKind,
    pub text: String,
}

impl Reply {
    fn new(kind: ReplyKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn missing_argument() -> Self {
        Self::new(
            ReplyKind::MissingArgument,
            "You need to name whose tracks to remove!",
        )
    }

    pub fn queue_empty() -> Self {
        Self::new(ReplyKind::QueueEmpty, "There is nothing in the queue!")
    }

    pub fn not_found() -> Self {
        Self::new(ReplyKind::NotFound, "Could not find that member!")
    }

    pub fn nothing_queued(member: &Member) -> Self {
        Self::new(
            ReplyKind::NothingQueued,
            format!("{} has no tracks in the queue!", member.label()),
        )
    }

    pub fn removed(member: &Member, count: usize) -> Self {
        Self::new(
            ReplyKind::Removed,
            format!(
                "Removed {} track(s) queued by {}.",
                count,
                member.label()
            ),
        )
    }

    pub fn cancelled() -> Self {
        Self::new(ReplyKind::Cancelled, "Cancelled!")
    }

    pub fn internal() -> Self {
        Self::new(ReplyKind::Internal, "Something went wrong. Please try again.")
    }
}

/// Where replies and prompts go; implemented once per invocation style.
///
/// A sink reporting `ReplyKind::Cancelled` owns the best-effort retraction
/// of that acknowledgment after the configured delay.
#[async_trait]
pub trait ResponseSink: Send + Sync {
    async fn report(&self, reply: Reply) -> Result<()>;

    /// Present a numbered choice prompt plus a cancel option. The
    /// correlation id must come back with the eventual selection.
    async fn prompt_choices(&self, correlation_id: &str, candidates: &[Member]) -> Result<()>;

    /// Retire the prompt's interactive controls once it is resolved or
    /// expired. Best-effort; the default does nothing.
    async fn close_prompt(&self) {}
}

/// Body text shared by both prompt presentations.
pub fn prompt_text(candidates: &[Member]) -> String {
    let mut text = String::from("Found several members:\n");
    for (i, member) in candidates.iter().enumerate() {
        text.push_str(&format!("{} {}\n", i, member.label()));
    }
    text
}

/// The force-remove command against one queue, roster, and prompt registry.
#[derive(Clone)]
pub struct ForceRemove {
    queue: TrackQueue,
    roster: Roster,
    registry: SelectRegistry,
    prompt_timeout: Duration,
    max_choices: usize,
}

impl ForceRemove {
    pub fn new(
        queue: TrackQueue,
        roster: Roster,
        registry: SelectRegistry,
        prompt_timeout: Duration,
        max_choices: usize,
    ) -> Self {
        Self {
            queue,
            roster,
            registry,
            prompt_timeout,
            max_choices,
        }
    }

    /// Run one invocation end to end.
    ///
    /// Suspends while a prompt is open without holding any lock, so other
    /// chats keep flowing. Expiry is terminal and silent.
    pub async fn run(
        &self,
        invoker_id: i64,
        query: &str,
        style: InvokeStyle,
        sink: &dyn ResponseSink,
    ) -> Result<()> {
        if style == InvokeStyle::Direct && query.trim().is_empty() {
            return sink.report(Reply::missing_argument()).await;
        }

        if self.queue.is_empty() {
            return sink.report(Reply::queue_empty()).await;
        }

        let found = self.roster.resolve(query);

        let target = match found.len() {
            0 => return sink.report(Reply::not_found()).await,
            1 => found.into_iter().next().unwrap(),
            _ => {
                // Only the first few candidates are offered; anything past
                // the cutoff is unreachable for this invocation.
                let offered: Vec<Member> =
                    found.into_iter().take(self.max_choices).collect();

                let (correlation_id, rx) =
                    self.registry
                        .open(invoker_id, offered.clone(), self.prompt_timeout);
                if let Err(e) = sink.prompt_choices(&correlation_id, &offered).await {
                    // Nobody ever saw the prompt; drop it before bailing.
                    self.registry.close(&correlation_id);
                    return Err(e);
                }

                let outcome = self
                    .registry
                    .wait(&correlation_id, rx, self.prompt_timeout)
                    .await;
                sink.close_prompt().await;

                match outcome {
                    SelectOutcome::Chosen(member) => member,
                    SelectOutcome::Cancelled => {
                        return sink.report(Reply::cancelled()).await;
                    }
                    SelectOutcome::Expired => {
                        tracing::debug!("Prompt for invoker {} expired", invoker_id);
                        return Ok(());
                    }
                }
            }
        };

        let count = self.queue.remove_all_by_owner(target.id);
        if count == 0 {
            sink.report(Reply::nothing_queued(&target)).await
        } else {
            sink.report(Reply::removed(&target, count)).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::disambig::Choice;
    use crate::core::queue::Track;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    enum Event {
        Reply(ReplyKind),
        Prompt { correlation_id: String, offered: usize },
        PromptClosed,
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        events: Arc<Mutex<Vec<Event>>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn kinds(&self) -> Vec<ReplyKind> {
            self.events()
                .iter()
                .filter_map(|e| match e {
                    Event::Reply(k) => Some(*k),
                    _ => None,
                })
                .collect()
        }

        fn prompt(&self) -> Option<(String, usize)> {
            self.events().iter().find_map(|e| match e {
                Event::Prompt {
                    correlation_id,
                    offered,
                } => Some((correlation_id.clone(), *offered)),
                _ => None,
            })
        }

        fn prompt_closed(&self) -> bool {
            self.events()
                .iter()
                .any(|e| matches!(e, Event::PromptClosed))
        }
    }

    #[async_trait]
    impl ResponseSink for RecordingSink {
        async fn report(&self, reply: Reply) -> Result<()> {
            self.events.lock().unwrap().push(Event::Reply(reply.kind));
            Ok(())
        }

        async fn prompt_choices(
            &self,
            correlation_id: &str,
            candidates: &[Member],
        ) -> Result<()> {
            self.events.lock().unwrap().push(Event::Prompt {
                correlation_id: correlation_id.to_string(),
                offered: candidates.len(),
            });
            Ok(())
        }

        async fn close_prompt(&self) {
            self.events.lock().unwrap().push(Event::PromptClosed);
        }
    }

    /// A sink whose transport is down: every delivery fails.
    struct FailingSink;

    #[async_trait]
    impl ResponseSink for FailingSink {
        async fn report(&self, _reply: Reply) -> Result<()> {
            Err(crate::error::Error::Telegram("send failed".to_string()))
        }

        async fn prompt_choices(
            &self,
            _correlation_id: &str,
            _candidates: &[Member],
        ) -> Result<()> {
            Err(crate::error::Error::Telegram("send failed".to_string()))
        }
    }

    const DJ: i64 = 1000;

    struct Fixture {
        cmd: ForceRemove,
        queue: TrackQueue,
        roster: Roster,
        registry: SelectRegistry,
    }

    fn fixture(timeout: Duration) -> Fixture {
        let queue = TrackQueue::new();
        let roster = Roster::new();
        let registry = SelectRegistry::new();
        let cmd = ForceRemove::new(
            queue.clone(),
            roster.clone(),
            registry.clone(),
            timeout,
            4,
        );
        Fixture {
            cmd,
            queue,
            roster,
            registry,
        }
    }

    async fn wait_for_prompt(sink: &RecordingSink) -> String {
        for _ in 0..100 {
            if let Some((id, _)) = sink.prompt() {
                return id;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("prompt never presented");
    }

    #[tokio::test]
    async fn test_missing_argument_direct_only() {
        let f = fixture(Duration::from_secs(60));
        let sink = RecordingSink::default();

        f.cmd.run(DJ, "  ", InvokeStyle::Direct, &sink).await.unwrap();

        assert_eq!(sink.kinds(), vec![ReplyKind::MissingArgument]);
    }

    #[tokio::test]
    async fn test_empty_queue_short_circuits() {
        let f = fixture(Duration::from_secs(60));
        f.roster.register(Member::new(1, "Alice"));
        let sink = RecordingSink::default();

        f.cmd
            .run(DJ, "alice", InvokeStyle::Direct, &sink)
            .await
            .unwrap();

        // Short-circuits before resolution: the reply is QueueEmpty even
        // though the query would have matched.
        assert_eq!(sink.kinds(), vec![ReplyKind::QueueEmpty]);
    }

    #[tokio::test]
    async fn test_no_match_never_mutates() {
        let f = fixture(Duration::from_secs(60));
        f.roster.register(Member::new(1, "Alice"));
        f.queue.push(Track::new(1, "Alice", "song"));
        let sink = RecordingSink::default();

        f.cmd
            .run(DJ, "zelda", InvokeStyle::Deferred, &sink)
            .await
            .unwrap();

        assert_eq!(sink.kinds(), vec![ReplyKind::NotFound]);
        assert_eq!(f.queue.len(), 1);
    }

    #[tokio::test]
    async fn test_single_match_skips_prompt() {
        let f = fixture(Duration::from_secs(60));
        f.roster.register(Member::new(1, "Alice"));
        f.roster.register(Member::new(2, "Bob"));
        for _ in 0..3 {
            f.queue.push(Track::new(1, "Alice", "song"));
        }
        f.queue.push(Track::new(2, "Bob", "song"));
        let sink = RecordingSink::default();

        f.cmd
            .run(DJ, "alice", InvokeStyle::Direct, &sink)
            .await
            .unwrap();

        assert!(sink.prompt().is_none());
        assert_eq!(sink.kinds(), vec![ReplyKind::Removed]);
        assert_eq!(f.queue.len(), 1);
        assert_eq!(f.registry.open_count(), 0);
    }

    #[tokio::test]
    async fn test_single_match_with_nothing_queued_warns() {
        let f = fixture(Duration::from_secs(60));
        f.roster.register(Member::new(1, "Alice"));
        f.roster.register(Member::new(2, "Bob"));
        f.queue.push(Track::new(2, "Bob", "song"));
        let sink = RecordingSink::default();

        f.cmd
            .run(DJ, "alice", InvokeStyle::Direct, &sink)
            .await
            .unwrap();

        assert_eq!(sink.kinds(), vec![ReplyKind::NothingQueued]);
        assert_eq!(f.queue.len(), 1);
    }

    /// Roster with five members named Sam0..Sam4, each with one track, plus
    /// one track from Bob so removal effects are distinguishable.
    fn crowded(f: &Fixture) {
        for i in 0..5i64 {
            f.roster.register(Member::new(20 + i, &format!("Sam{}", i)));
            f.queue
                .push(Track::new(20 + i, &format!("Sam{}", i), "song"));
        }
        f.queue.push(Track::new(99, "Bob", "song"));
    }

    #[tokio::test]
    async fn test_five_matches_offer_four_choices() {
        let f = fixture(Duration::from_secs(60));
        crowded(&f);
        let sink = RecordingSink::default();

        let cmd = f.cmd.clone();
        let task_sink = sink.clone();
        let task = tokio::spawn(async move {
            cmd.run(DJ, "sam", InvokeStyle::Direct, &task_sink).await
        });

        let correlation_id = wait_for_prompt(&sink).await;
        let (_, offered) = sink.prompt().unwrap();
        assert_eq!(offered, 4);

        // Choice 2 targets Sam2 (stable id ordering).
        assert!(f.registry.respond(&correlation_id, DJ, Choice::Index(2)));
        task.await.unwrap().unwrap();

        assert_eq!(sink.kinds(), vec![ReplyKind::Removed]);
        assert!(sink.prompt_closed());
        assert_eq!(f.queue.len(), 5);
        assert!(f.queue.snapshot().iter().all(|t| t.owner_id != 22));
    }

    #[tokio::test]
    async fn test_cancel_removes_nothing() {
        let f = fixture(Duration::from_secs(60));
        crowded(&f);
        let sink = RecordingSink::default();

        let cmd = f.cmd.clone();
        let task_sink = sink.clone();
        let task = tokio::spawn(async move {
            cmd.run(DJ, "sam", InvokeStyle::Deferred, &task_sink).await
        });

        let correlation_id = wait_for_prompt(&sink).await;
        assert!(f.registry.respond(&correlation_id, DJ, Choice::Cancel));
        task.await.unwrap().unwrap();

        assert_eq!(sink.kinds(), vec![ReplyKind::Cancelled]);
        assert_eq!(f.queue.len(), 6);
    }

    #[tokio::test]
    async fn test_timeout_removes_nothing_and_stays_silent() {
        let f = fixture(Duration::from_millis(30));
        crowded(&f);
        let sink = RecordingSink::default();

        f.cmd
            .run(DJ, "sam", InvokeStyle::Direct, &sink)
            .await
            .unwrap();

        // Prompt only, no reply of any kind after expiry, controls retired.
        assert!(sink.prompt().is_some());
        assert!(sink.prompt_closed());
        assert!(sink.kinds().is_empty());
        assert_eq!(f.queue.len(), 6);
        assert_eq!(f.registry.open_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_prompt_send_mutates_nothing() {
        let f = fixture(Duration::from_secs(60));
        crowded(&f);

        let result = f
            .cmd
            .run(DJ, "sam", InvokeStyle::Direct, &FailingSink)
            .await;

        assert!(matches!(result, Err(crate::error::Error::Telegram(_))));
        assert_eq!(f.queue.len(), 6);
        // The unseen prompt is dropped rather than left for the sweep.
        assert_eq!(f.registry.open_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_report_propagates() {
        let f = fixture(Duration::from_secs(60));
        f.roster.register(Member::new(1, "Alice"));
        f.queue.push(Track::new(1, "Alice", "song"));

        let result = f
            .cmd
            .run(DJ, "alice", InvokeStyle::Direct, &FailingSink)
            .await;

        assert!(matches!(result, Err(crate::error::Error::Telegram(_))));
    }

    #[tokio::test]
    async fn test_failed_empty_queue_report_propagates() {
        let f = fixture(Duration::from_secs(60));

        let result = f
            .cmd
            .run(DJ, "anyone", InvokeStyle::Direct, &FailingSink)
            .await;

        assert!(matches!(result, Err(crate::error::Error::Telegram(_))));
        assert!(f.queue.is_empty());
    }

    #[tokio::test]
    async fn test_non_invoker_response_does_not_resolve() {
        let f = fixture(Duration::from_millis(60));
        crowded(&f);
        let sink = RecordingSink::default();

        let cmd = f.cmd.clone();
        let task_sink = sink.clone();
        let task = tokio::spawn(async move {
            cmd.run(DJ, "sam", InvokeStyle::Direct, &task_sink).await
        });

        let correlation_id = wait_for_prompt(&sink).await;
        assert!(!f.registry.respond(&correlation_id, 777, Choice::Index(0)));
        task.await.unwrap().unwrap();

        // The prompt expired untouched.
        assert!(sink.kinds().is_empty());
        assert_eq!(f.queue.len(), 6);
    }

    #[tokio::test]
    async fn test_removal_scenario_counts() {
        let f = fixture(Duration::from_secs(60));
        f.roster.register(Member::new(1, "Alice"));
        f.roster.register(Member::new(2, "Bob"));
        for _ in 0..3 {
            f.queue.push(Track::new(1, "Alice", "song"));
        }
        for _ in 0..2 {
            f.queue.push(Track::new(2, "Bob", "song"));
        }
        let sink = RecordingSink::default();

        f.cmd
            .run(DJ, "bob", InvokeStyle::Direct, &sink)
            .await
            .unwrap();

        assert_eq!(sink.kinds(), vec![ReplyKind::Removed]);
        assert_eq!(f.queue.len(), 3);
        assert!(f.queue.snapshot().iter().all(|t| t.owner_id == 1));
    }
}
