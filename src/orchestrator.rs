// ============================================================================
// File: src/orchestrator.rs
// Two-stage search pipeline: answer, then references
// ============================================================================

use thiserror::Error;
use tracing::{debug, info};

use crate::history::{FailurePolicy, SearchRecord, Session};
use crate::llm_client::{CompletionClient, CompletionOutcome};
use crate::models::Message;
use crate::topic_gate::TopicGate;

/// Marker that flags an out-of-domain answer, from the gate or the model.
pub const REFUSAL_MARKER: &str = "🚫";

pub const GATE_REFUSAL: &str = "🚫 This question is not related to Islam. Please ask something relevant.";
pub const MODEL_REFUSAL: &str = "🚫 This is not related to Islam.";

pub const FAILURE_MESSAGE: &str = "⚠ The knowledge service is unavailable right now. Please try again later.";

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("please enter a question")]
    EmptyQuery,
}

/// Which completion call a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Answer,
    References,
}

/// Where a pipeline run is. `Rejected`, `Referenced` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    AwaitingQuery,
    Answered { answer: String },
    Rejected { message: String },
    Referenced { answer: String, references: String },
    Failed { stage: Stage, attempts: usize, reason: String },
}

/// Terminal result of one run
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Rejected { message: String },
    Referenced { answer: String, references: String },
    Failed { stage: Stage, attempts: usize, reason: String },
}

pub struct KnowledgePipeline {
    gate: TopicGate,
    client: CompletionClient,
}

impl KnowledgePipeline {
    pub fn new(gate: TopicGate, client: CompletionClient) -> Self {
        Self { gate, client }
    }

    /// Run one query to a terminal state and record it in the session.
    pub async fn run(&self, session: &mut Session, query: &str) -> Result<PipelineOutcome, QueryError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let mut state = PipelineState::AwaitingQuery;
        let outcome = loop {
            state = self.step(state, query).await;
            debug!(?state, "Pipeline transition");
            if let Some(outcome) = state.terminal() {
                break outcome;
            }
        };

        if let Some(record) = Self::to_record(query, &outcome, session.failure_policy) {
            session.history.record(record);
        }

        Ok(outcome)
    }

    async fn step(&self, state: PipelineState, query: &str) -> PipelineState {
        match state {
            PipelineState::AwaitingQuery => {
                if !self.gate.is_in_domain(query) {
                    info!("Query rejected by topic gate");
                    return PipelineState::Rejected {
                        message: GATE_REFUSAL.to_string(),
                    };
                }

                match self.client.complete(&[Message::user(Self::search_prompt(query))]).await {
                    CompletionOutcome::Text(answer) => PipelineState::Answered { answer },
                    CompletionOutcome::Failed { attempts, reason } => PipelineState::Failed {
                        stage: Stage::Answer,
                        attempts,
                        reason,
                    },
                }
            }
            PipelineState::Answered { answer } => {
                if answer.contains(REFUSAL_MARKER) {
                    info!("Query rejected by model");
                    return PipelineState::Rejected { message: answer };
                }

                match self.client.complete(&[Message::user(Self::references_prompt(&answer))]).await {
                    CompletionOutcome::Text(references) => PipelineState::Referenced { answer, references },
                    CompletionOutcome::Failed { attempts, reason } => PipelineState::Failed {
                        stage: Stage::References,
                        attempts,
                        reason,
                    },
                }
            }
            terminal => terminal,
        }
    }

    fn search_prompt(query: &str) -> String {
        format!(
            "Only search in Islamic texts (Quran, Hadith, and Islamic history). \
             If the query is unrelated to Islam, return exactly this message: '{}'.\n\
             Question: {}",
            MODEL_REFUSAL, query
        )
    }

    fn references_prompt(answer: &str) -> String {
        format!("find exact references for the: {}", answer)
    }

    fn to_record(query: &str, outcome: &PipelineOutcome, policy: FailurePolicy) -> Option<SearchRecord> {
        match outcome {
            PipelineOutcome::Rejected { message } => Some(SearchRecord::new(query, message.clone(), None)),
            PipelineOutcome::Referenced { answer, references } => {
                Some(SearchRecord::new(query, answer.clone(), Some(references.clone())))
            }
            PipelineOutcome::Failed { .. } => match policy {
                FailurePolicy::Persist => Some(SearchRecord::new(query, FAILURE_MESSAGE, None)),
                FailurePolicy::Skip => None,
            },
        }
    }
}

impl PipelineState {
    fn terminal(&self) -> Option<PipelineOutcome> {
        match self {
            PipelineState::AwaitingQuery | PipelineState::Answered { .. } => None,
            PipelineState::Rejected { message } => Some(PipelineOutcome::Rejected {
                message: message.clone(),
            }),
            PipelineState::Referenced { answer, references } => Some(PipelineOutcome::Referenced {
                answer: answer.clone(),
                references: references.clone(),
            }),
            PipelineState::Failed { stage, attempts, reason } => Some(PipelineOutcome::Failed {
                stage: *stage,
                attempts: *attempts,
                reason: reason.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::ScriptedBackend;
    use crate::llm_client::CompletionError;

    fn pipeline(backend: &ScriptedBackend, max_retries: usize) -> KnowledgePipeline {
        KnowledgePipeline::new(
            TopicGate::default(),
            CompletionClient::new(Box::new(backend.clone()), max_retries),
        )
    }

    #[tokio::test]
    async fn blank_query_is_a_validation_error() {
        let backend = ScriptedBackend::new();
        let mut session = Session::new(FailurePolicy::Persist);

        for query in ["", "   ", "\n\t"] {
            let result = pipeline(&backend, 3).run(&mut session, query).await;
            assert_eq!(result, Err(QueryError::EmptyQuery));
        }
        assert_eq!(backend.calls(), 0);
        assert!(session.history.is_empty());
    }

    // Scenario A
    #[tokio::test]
    async fn off_topic_query_is_rejected_without_calls() {
        let backend = ScriptedBackend::new().reply("should never be used");
        let mut session = Session::new(FailurePolicy::Skip);

        let outcome = pipeline(&backend, 3).run(&mut session, "hello").await.unwrap();

        assert_eq!(outcome, PipelineOutcome::Rejected { message: GATE_REFUSAL.into() });
        assert_eq!(backend.calls(), 0);
        assert_eq!(session.history.len(), 1);
        let record = &session.history.all()[0];
        assert_eq!(record.query, "hello");
        assert_eq!(record.search_result, GATE_REFUSAL);
        assert!(record.references.is_none());
    }

    // Scenario B
    #[tokio::test]
    async fn in_domain_answer_gets_references() {
        let backend = ScriptedBackend::new()
            .reply("Patience is mentioned in Surah 2:153.")
            .reply("Al-Baqarah 2:153: \"O you who have believed, seek help through patience and prayer.\"");
        let mut session = Session::new(FailurePolicy::Skip);

        let outcome = pipeline(&backend, 3)
            .run(&mut session, "What does the Quran say about patience?")
            .await
            .unwrap();

        match &outcome {
            PipelineOutcome::Referenced { answer, references } => {
                assert_eq!(answer, "Patience is mentioned in Surah 2:153.");
                assert!(references.starts_with("Al-Baqarah 2:153"));
            }
            other => panic!("expected references, got {other:?}"),
        }
        assert_eq!(backend.calls(), 2);

        let prompts = backend.prompts();
        assert!(prompts[0].contains("Question: What does the Quran say about patience?"));
        assert!(prompts[0].contains(MODEL_REFUSAL));
        assert_eq!(
            prompts[1],
            "find exact references for the: Patience is mentioned in Surah 2:153."
        );

        let record = &session.history.all()[0];
        assert_eq!(record.search_result, "Patience is mentioned in Surah 2:153.");
        assert!(record.references.is_some());
    }

    #[tokio::test]
    async fn model_refusal_stops_after_one_call() {
        let backend = ScriptedBackend::new()
            .reply(MODEL_REFUSAL)
            .reply("should never be used");
        let mut session = Session::new(FailurePolicy::Skip);

        // Passes the keyword gate only through a substring match.
        let outcome = pipeline(&backend, 3)
            .run(&mut session, "Best hotels in Islamabad")
            .await
            .unwrap();

        assert_eq!(outcome, PipelineOutcome::Rejected { message: MODEL_REFUSAL.into() });
        assert_eq!(backend.calls(), 1);
        assert_eq!(session.history.all()[0].search_result, MODEL_REFUSAL);
        assert!(session.history.all()[0].references.is_none());
    }

    #[tokio::test]
    async fn marker_anywhere_in_answer_counts_as_refusal() {
        let backend = ScriptedBackend::new().reply("I cannot help. 🚫 Not about Islam.");
        let mut session = Session::new(FailurePolicy::Skip);

        let outcome = pipeline(&backend, 1).run(&mut session, "prophet of rock music").await.unwrap();

        assert!(matches!(outcome, PipelineOutcome::Rejected { .. }));
        assert_eq!(backend.calls(), 1);
    }

    // Scenario C, failures skipped
    #[tokio::test]
    async fn transport_failure_is_not_a_rejection() {
        let backend = ScriptedBackend::new();
        let mut session = Session::new(FailurePolicy::Skip);

        let outcome = pipeline(&backend, 2).run(&mut session, "Explain Fiqh").await.unwrap();

        match outcome {
            PipelineOutcome::Failed { stage, attempts, .. } => {
                assert_eq!(stage, Stage::Answer);
                assert_eq!(attempts, 2);
            }
            other => panic!("expected transport failure, got {other:?}"),
        }
        assert_eq!(backend.calls(), 2);
        assert!(session.history.is_empty());
    }

    // Scenario C, failures persisted
    #[tokio::test]
    async fn transport_failure_is_recorded_when_persisting() {
        let backend = ScriptedBackend::new();
        let mut session = Session::new(FailurePolicy::Persist);

        let outcome = pipeline(&backend, 3).run(&mut session, "Explain Fiqh").await.unwrap();

        assert!(matches!(outcome, PipelineOutcome::Failed { .. }));
        assert_eq!(session.history.len(), 1);
        let record = &session.history.all()[0];
        assert_eq!(record.search_result, FAILURE_MESSAGE);
        assert!(record.references.is_none());
    }

    #[tokio::test]
    async fn reference_stage_failure_reports_its_stage() {
        let backend = ScriptedBackend::new()
            .reply("Hadith on charity")
            .fail(CompletionError::Api { status: 500, body: "oops".into() });
        let mut session = Session::new(FailurePolicy::Skip);

        let outcome = pipeline(&backend, 1).run(&mut session, "Hadith about charity").await.unwrap();

        assert_eq!(
            outcome,
            PipelineOutcome::Failed {
                stage: Stage::References,
                attempts: 1,
                reason: "API error: HTTP 500: oops".into(),
            }
        );
        assert_eq!(backend.calls(), 2);
        assert!(session.history.is_empty());
    }

    #[tokio::test]
    async fn session_history_accumulates_newest_first() {
        let backend = ScriptedBackend::new().reply("answer").reply("refs");
        let mut session = Session::new(FailurePolicy::Skip);
        let pipeline = pipeline(&backend, 1);

        pipeline.run(&mut session, "weather today").await.unwrap();
        pipeline.run(&mut session, "Sunnah prayers").await.unwrap();

        let queries: Vec<_> = session.history.all().iter().map(|r| r.query.as_str()).collect();
        assert_eq!(queries, ["Sunnah prayers", "weather today"]);
    }
}
