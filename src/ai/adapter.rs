//! Escalating method chain around a generation backend.

use std::sync::Arc;

use super::{Generation, GenerationBackend, GenerationMethod};
use crate::error::{AnalysisError, AnalysisResult};

/// Returned in place of an empty answer once every method came back empty.
pub const GENERATION_FAILED_MESSAGE: &str =
    "The analysis for this section could not be generated. Please re-run this step.";

/// Ordered methods to try for one prompt.
///
/// The hinted method goes first, then the secondary method (unless it was the
/// hint), then the tertiary method. The chain only advances on empty output.
#[derive(Debug, Clone)]
pub struct MethodChain {
    methods: Vec<GenerationMethod>,
    current_index: usize,
}

impl MethodChain {
    /// Method tried after an empty first answer.
    pub const SECONDARY: GenerationMethod = GenerationMethod::Chat;

    /// Last-resort method.
    pub const TERTIARY: GenerationMethod = GenerationMethod::Completion;

    /// Build the chain for a method hint.
    pub fn starting_with(hint: GenerationMethod) -> Self {
        let mut methods = vec![hint];
        if hint != Self::SECONDARY {
            methods.push(Self::SECONDARY);
        }
        methods.push(Self::TERTIARY);
        Self { methods, current_index: 0 }
    }

    /// Get the current method.
    pub fn current(&self) -> Option<GenerationMethod> {
        self.methods.get(self.current_index).copied()
    }

    /// Move to the next method.
    pub fn advance(&mut self) -> Option<GenerationMethod> {
        self.current_index += 1;
        self.current()
    }

    /// All methods in the chain.
    pub fn methods(&self) -> &[GenerationMethod] {
        &self.methods
    }
}

/// Calls a backend, escalating through the method chain on empty output.
#[derive(Clone)]
pub struct GenerationAdapter {
    backend: Arc<dyn GenerationBackend>,
}

impl GenerationAdapter {
    /// Wrap a backend.
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Name of the wrapped backend.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Run one prompt.
    ///
    /// The first non-empty output wins. Hard failures return immediately.
    /// If every method yields nothing, the output is
    /// [`GENERATION_FAILED_MESSAGE`], never an empty string.
    pub async fn invoke(
        &self,
        prompt: &str,
        hint: GenerationMethod,
    ) -> AnalysisResult<Generation> {
        let mut chain = MethodChain::starting_with(hint);

        while let Some(method) = chain.current() {
            match self.backend.generate(prompt, method).await {
                Ok(generation) if !generation.is_empty() => {
                    tracing::debug!(backend = self.backend.name(), %method, "Generation succeeded");
                    return Ok(generation);
                }
                Ok(_) | Err(AnalysisError::EmptyGenerationResult) => {
                    tracing::warn!(
                        backend = self.backend.name(),
                        %method,
                        "Empty generation, escalating"
                    );
                }
                Err(e @ AnalysisError::GenerationBackendFailure(_)) => return Err(e),
                Err(e) => return Err(AnalysisError::GenerationBackendFailure(e.to_string())),
            }
            chain.advance();
        }

        tracing::warn!(backend = self.backend.name(), "All generation methods returned empty");
        Ok(Generation::output(GENERATION_FAILED_MESSAGE))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Backend replaying scripted answers and recording the methods it saw.
    struct Scripted {
        answers: Mutex<VecDeque<AnalysisResult<Generation>>>,
        seen: Mutex<Vec<GenerationMethod>>,
    }

    impl Scripted {
        fn new(answers: Vec<AnalysisResult<Generation>>) -> Arc<Self> {
            Arc::new(Self { answers: Mutex::new(answers.into()), seen: Mutex::new(Vec::new()) })
        }

        fn seen(&self) -> Vec<GenerationMethod> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerationBackend for Scripted {
        async fn generate(
            &self,
            _prompt: &str,
            method: GenerationMethod,
        ) -> AnalysisResult<Generation> {
            self.seen.lock().unwrap().push(method);
            self.answers.lock().unwrap().pop_front().unwrap_or_else(|| Ok(Generation::default()))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    #[test]
    fn test_chain_from_primary() {
        let chain = MethodChain::starting_with(GenerationMethod::Reasoning);
        assert_eq!(
            chain.methods(),
            &[GenerationMethod::Reasoning, GenerationMethod::Chat, GenerationMethod::Completion]
        );
    }

    #[test]
    fn test_chain_from_secondary_skips_repeat() {
        let chain = MethodChain::starting_with(GenerationMethod::Chat);
        assert_eq!(chain.methods(), &[GenerationMethod::Chat, GenerationMethod::Completion]);
    }

    #[test]
    fn test_chain_advance_exhausts() {
        let mut chain = MethodChain::starting_with(GenerationMethod::Chat);
        assert_eq!(chain.current(), Some(GenerationMethod::Chat));
        assert_eq!(chain.advance(), Some(GenerationMethod::Completion));
        assert_eq!(chain.advance(), None);
    }

    #[tokio::test]
    async fn test_first_non_empty_wins() {
        let backend = Scripted::new(vec![Ok(Generation::default()), Ok(Generation::output("ok"))]);
        let adapter = GenerationAdapter::new(backend.clone());

        let result = adapter.invoke("prompt", GenerationMethod::Reasoning).await.unwrap();
        assert_eq!(result.output, "ok");
        assert_eq!(backend.seen(), vec![GenerationMethod::Reasoning, GenerationMethod::Chat]);
    }

    #[tokio::test]
    async fn test_empty_error_escalates() {
        let backend = Scripted::new(vec![
            Err(AnalysisError::EmptyGenerationResult),
            Ok(Generation::output("   ")),
            Ok(Generation::output("last")),
        ]);
        let adapter = GenerationAdapter::new(backend.clone());

        let result = adapter.invoke("prompt", GenerationMethod::Reasoning).await.unwrap();
        assert_eq!(result.output, "last");
        assert_eq!(backend.seen().len(), 3);
    }

    #[tokio::test]
    async fn test_all_empty_yields_failure_message() {
        let backend = Scripted::new(Vec::new());
        let adapter = GenerationAdapter::new(backend.clone());

        let result = adapter.invoke("prompt", GenerationMethod::Reasoning).await.unwrap();
        assert_eq!(result.output, GENERATION_FAILED_MESSAGE);
        assert!(!result.output.is_empty());
        assert_eq!(backend.seen().len(), 3);
    }

    #[tokio::test]
    async fn test_hard_failure_reported_immediately() {
        let backend = Scripted::new(vec![
            Err(AnalysisError::GenerationBackendFailure("401 unauthorized".into())),
            Ok(Generation::output("never reached")),
        ]);
        let adapter = GenerationAdapter::new(backend.clone());

        let err = adapter.invoke("prompt", GenerationMethod::Reasoning).await.unwrap_err();
        assert!(err.is_backend_failure());
        assert_eq!(backend.seen(), vec![GenerationMethod::Reasoning]);
    }
}
