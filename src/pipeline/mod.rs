//! Execution pipeline.
//!
//! Steps run strictly in final order. Before a step starts, its context is
//! rebuilt from the records of every earlier step, so nothing a later step
//! produced can leak backward. Each step's sub-stages are sent through the
//! generation adapter one at a time, with a fixed pause between calls.
//!
//! State transitions per step:
//!
//! ```text
//! Pending(i) -> Running(i, s) -> StepComplete(i) -> Pending(i + 1) | AllComplete
//!                    \-> Failed(i)  (resumable from i)
//! ```

mod record;
mod state;

pub use record::{combine, truncate_chars, StageResult, StepRecord};
pub use state::{PipelinePhase, PipelineState, RunContext};

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::ai::{GenerationAdapter, GenerationMethod};
use crate::catalog::{DefinitionSet, Step};
use crate::core::Config;
use crate::error::{AnalysisError, AnalysisResult};
use crate::prompt::{DocumentSource, ProjectFields, PromptCompiler, PromptInputs};

/// How a `run_all` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every step has a record
    Completed,

    /// Stopped at a step boundary
    Cancelled,
}

/// Session inputs that do not change between steps.
#[derive(Clone, Copy)]
pub struct SessionInputs<'a> {
    /// User-supplied project fields
    pub fields: &'a ProjectFields,

    /// Uploaded document, if any
    pub documents: Option<&'a dyn DocumentSource>,
}

/// Drives steps through prompt compilation and generation.
pub struct Pipeline {
    adapter: GenerationAdapter,
    compiler: PromptCompiler,
    definitions: DefinitionSet,
    method: GenerationMethod,
    inter_call_delay: Duration,
    context_chars: usize,
    summary_chars: usize,
}

impl Pipeline {
    /// Create a pipeline with default settings.
    pub fn new(adapter: GenerationAdapter, definitions: DefinitionSet) -> Self {
        Self::from_config(adapter, definitions, &Config::default())
    }

    /// Create a pipeline from configuration.
    pub fn from_config(
        adapter: GenerationAdapter,
        definitions: DefinitionSet,
        config: &Config,
    ) -> Self {
        Self {
            adapter,
            compiler: PromptCompiler::new(config.pipeline.max_passages),
            definitions,
            method: config.ai.method,
            inter_call_delay: config.pipeline.inter_call_delay(),
            context_chars: config.pipeline.context_chars_per_step,
            summary_chars: config.pipeline.summary_chars,
        }
    }

    /// Set the pause between backend calls.
    pub fn with_inter_call_delay(mut self, delay: Duration) -> Self {
        self.inter_call_delay = delay;
        self
    }

    /// Set the method tried first for steps that declare none.
    pub fn with_method(mut self, method: GenerationMethod) -> Self {
        self.method = method;
        self
    }

    /// Run the next pending step and store its record.
    ///
    /// On failure the phase becomes `Failed` at that step, earlier records are
    /// untouched, and calling again retries the same step.
    pub async fn execute_step(
        &self,
        state: &mut PipelineState,
        inputs: SessionInputs<'_>,
    ) -> AnalysisResult<()> {
        let Some(index) = state.next_index() else {
            state.set_phase(PipelinePhase::AllComplete);
            return Ok(());
        };

        match self.run_step(state, index, inputs).await {
            Ok(record) => {
                tracing::info!(
                    step = record.step_id,
                    stages = record.results.len(),
                    "Step complete"
                );
                state.store(record);
                state.set_phase(PipelinePhase::StepComplete(index));
                state.advance();
                Ok(())
            }
            Err(e) => {
                tracing::warn!(step = index + 1, error = %e, "Step failed");
                state.set_phase(PipelinePhase::Failed { step: index, message: e.to_string() });
                Err(e)
            }
        }
    }

    /// Run steps until every one has a record, a step fails, or `stop` is set.
    ///
    /// `stop` is only checked between steps.
    pub async fn run_all(
        &self,
        state: &mut PipelineState,
        inputs: SessionInputs<'_>,
        stop: &AtomicBool,
    ) -> AnalysisResult<RunOutcome> {
        self.run_all_with_progress(state, inputs, stop, |_, _, _| {}).await
    }

    /// Run all remaining steps with a progress callback.
    ///
    /// The callback is called before each step starts with
    /// (step_index, total_steps, step).
    pub async fn run_all_with_progress<F>(
        &self,
        state: &mut PipelineState,
        inputs: SessionInputs<'_>,
        stop: &AtomicBool,
        mut on_progress: F,
    ) -> AnalysisResult<RunOutcome>
    where
        F: FnMut(usize, usize, &Step),
    {
        while let Some(index) = state.next_index() {
            if stop.load(Ordering::SeqCst) {
                tracing::info!(phase = %state.phase(), "Pipeline stopped");
                return Ok(RunOutcome::Cancelled);
            }
            on_progress(index, state.steps().len(), &state.steps()[index]);
            self.execute_step(state, inputs).await?;
        }
        Ok(RunOutcome::Completed)
    }

    /// Execute a completed step again and replace its record.
    ///
    /// Later steps keep their records; they must be re-run to see the change.
    pub async fn rerun_step(
        &self,
        state: &mut PipelineState,
        index: usize,
        inputs: SessionInputs<'_>,
    ) -> AnalysisResult<()> {
        let step_id = match state.steps().get(index) {
            Some(step) if state.record(&step.id).is_some() => step.id.clone(),
            Some(step) => return Err(AnalysisError::StepNotExecuted(step.id.clone())),
            None => return Err(AnalysisError::StepNotExecuted(format!("#{}", index + 1))),
        };

        let resume = state.phase().clone();
        let outcome = self.run_step(state, index, inputs).await;
        state.set_phase(resume);

        let record = outcome?;
        tracing::info!(step = step_id, "Step re-run complete");
        state.store(record);
        Ok(())
    }

    /// Compile and generate every sub-stage of one step.
    async fn run_step(
        &self,
        state: &mut PipelineState,
        index: usize,
        inputs: SessionInputs<'_>,
    ) -> AnalysisResult<StepRecord> {
        let step = state.steps()[index].clone();
        let definition = self.definitions.resolve(&step);
        let context = state.context_for(index, self.context_chars);

        let prompt_inputs = PromptInputs {
            fields: inputs.fields,
            prior_context: context.as_str(),
            documents: inputs.documents,
        };
        let base = self.compiler.compile_base(&definition, &prompt_inputs);
        let method = definition.method.unwrap_or(self.method);

        let mut results = BTreeMap::new();
        for stage in PromptCompiler::compile_sub_stages(&base, &definition) {
            state.set_phase(PipelinePhase::Running { step: index, sub_stage: stage.index });
            self.wait_for_slot(state).await;

            let generation = self.adapter.invoke(&stage.prompt, method).await;
            state.last_call = Some(tokio::time::Instant::now());
            let generation = generation?;
            results.insert(
                stage.index,
                StageResult {
                    label: stage.label,
                    output: generation.output,
                    reasoning: generation.reasoning,
                },
            );
        }

        Ok(StepRecord::new(&step, base, results, self.summary_chars))
    }

    /// Wait out the inter-call delay since the previous backend call returned.
    async fn wait_for_slot(&self, state: &PipelineState) {
        if let Some(last) = state.last_call {
            tokio::time::sleep_until(last + self.inter_call_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::ai::{Generation, GenerationBackend, GENERATION_FAILED_MESSAGE};
    use crate::catalog::Tier;

    /// Backend numbering its answers and failing on one chosen call.
    struct Numbered {
        prompts: Mutex<Vec<String>>,
        fail_on: Option<usize>,
        empty: bool,
    }

    impl Numbered {
        fn new() -> Arc<Self> {
            Arc::new(Self { prompts: Mutex::new(Vec::new()), fail_on: None, empty: false })
        }

        fn failing_on(call: usize) -> Arc<Self> {
            Arc::new(Self { prompts: Mutex::new(Vec::new()), fail_on: Some(call), empty: false })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerationBackend for Numbered {
        async fn generate(
            &self,
            prompt: &str,
            _method: GenerationMethod,
        ) -> AnalysisResult<Generation> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            let call = prompts.len();
            if self.fail_on == Some(call) {
                return Err(AnalysisError::GenerationBackendFailure("503".into()));
            }
            if self.empty {
                return Ok(Generation::default());
            }
            Ok(Generation::output(format!("Answer {call}. We recommend option {call}.")))
        }

        fn name(&self) -> &str {
            "numbered"
        }
    }

    const DEFINITIONS: &str = r#"
steps:
  - id: alpha
    goal: First analysis
    output_structure: [Facts, Reading]
  - id: beta
    goal: Second analysis
    output_structure: [Verdict]
"#;

    fn steps() -> Vec<Step> {
        vec![
            Step::new("alpha", "Alpha", "first", Tier::Required, 1, "x"),
            Step::new("beta", "Beta", "second", Tier::Recommended, 2, "x"),
        ]
    }

    fn pipeline(backend: Arc<dyn GenerationBackend>) -> Pipeline {
        let definitions = DefinitionSet::from_yaml_str(DEFINITIONS).unwrap();
        Pipeline::new(GenerationAdapter::new(backend), definitions)
            .with_inter_call_delay(Duration::ZERO)
    }

    fn inputs(fields: &ProjectFields) -> SessionInputs<'_> {
        SessionInputs { fields, documents: None }
    }

    #[tokio::test]
    async fn test_step_runs_declared_stages_in_order() {
        let backend = Numbered::new();
        let pipeline = pipeline(backend.clone());
        let mut state = PipelineState::new(steps());
        let fields = ProjectFields::default();

        pipeline.execute_step(&mut state, inputs(&fields)).await.unwrap();

        let record = state.record("alpha").unwrap();
        assert_eq!(record.results.len(), 2);
        assert_eq!(
            record.result,
            "Facts\nAnswer 1. We recommend option 1.\n\nReading\nAnswer 2. We recommend option 2."
        );
        assert_eq!(record.insight, "We recommend option 2.");
        assert_eq!(state.phase(), &PipelinePhase::Pending(1));
        assert_eq!(backend.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_later_prompt_sees_earlier_records_only() {
        let backend = Numbered::new();
        let pipeline = pipeline(backend.clone());
        let mut state = PipelineState::new(steps());
        let fields = ProjectFields::default();

        let outcome =
            pipeline.run_all(&mut state, inputs(&fields), &AtomicBool::new(false)).await.unwrap();
        assert_eq!(outcome, RunOutcome::Completed);
        assert!(state.is_complete());
        assert_eq!(state.progress(), (2, 2));

        let prompts = backend.prompts();
        assert!(prompts[0].contains("No earlier steps have been completed."));
        assert!(prompts[2].contains("## [1] Alpha"));
        assert!(prompts[2].contains("Answer 2."));
        assert!(!prompts[1].contains("Answer 1."));
    }

    #[tokio::test]
    async fn test_failure_keeps_records_and_is_resumable() {
        let backend = Numbered::failing_on(3);
        let pipeline = pipeline(backend.clone());
        let mut state = PipelineState::new(steps());
        let fields = ProjectFields::default();

        let err = pipeline
            .run_all(&mut state, inputs(&fields), &AtomicBool::new(false))
            .await
            .unwrap_err();
        assert!(err.is_backend_failure());
        assert!(matches!(state.phase(), PipelinePhase::Failed { step: 1, .. }));
        assert_eq!(state.progress(), (1, 2));
        let alpha = state.record("alpha").unwrap().clone();

        pipeline.execute_step(&mut state, inputs(&fields)).await.unwrap();
        assert!(state.is_complete());
        assert_eq!(state.record("alpha"), Some(&alpha));
        assert!(state.record("beta").unwrap().result.contains("Answer 4."));
    }

    #[tokio::test]
    async fn test_stop_flag_checked_between_steps() {
        let backend = Numbered::new();
        let pipeline = pipeline(backend.clone());
        let mut state = PipelineState::new(steps());
        let fields = ProjectFields::default();

        let stop = AtomicBool::new(true);
        let outcome = pipeline.run_all(&mut state, inputs(&fields), &stop).await.unwrap();
        assert_eq!(outcome, RunOutcome::Cancelled);
        assert!(backend.prompts().is_empty());
        assert_eq!(state.phase(), &PipelinePhase::Pending(0));
    }

    #[tokio::test]
    async fn test_progress_reported_before_each_step() {
        let pipeline = pipeline(Numbered::new());
        let mut state = PipelineState::new(steps());
        let fields = ProjectFields::default();

        let stop = AtomicBool::new(false);
        let mut seen = Vec::new();
        let outcome = pipeline
            .run_all_with_progress(&mut state, inputs(&fields), &stop, |i, n, step| {
                seen.push((i, n, step.id.clone()));
            })
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(seen, vec![(0, 2, "alpha".to_string()), (1, 2, "beta".to_string())]);
    }

    /// Backend that takes a fixed time per call and logs when each call ran.
    struct Slow {
        latency: Duration,
        calls: Mutex<Vec<(tokio::time::Instant, tokio::time::Instant)>>,
        fail_first: bool,
    }

    #[async_trait]
    impl GenerationBackend for Slow {
        async fn generate(
            &self,
            _prompt: &str,
            _method: GenerationMethod,
        ) -> AnalysisResult<Generation> {
            let start = tokio::time::Instant::now();
            tokio::time::sleep(self.latency).await;
            let mut calls = self.calls.lock().unwrap();
            calls.push((start, tokio::time::Instant::now()));
            if self.fail_first && calls.len() == 1 {
                return Err(AnalysisError::GenerationBackendFailure("503".into()));
            }
            Ok(Generation::output("Done."))
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    fn slow(latency: Duration, fail_first: bool) -> Arc<Slow> {
        Arc::new(Slow { latency, calls: Mutex::new(Vec::new()), fail_first })
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_counts_from_previous_call_returning() {
        let delay = Duration::from_millis(1000);
        let backend = slow(Duration::from_millis(300), false);
        let definitions = DefinitionSet::from_yaml_str(DEFINITIONS).unwrap();
        let pipeline = Pipeline::new(GenerationAdapter::new(backend.clone()), definitions)
            .with_inter_call_delay(delay);
        let mut state = PipelineState::new(steps());
        let fields = ProjectFields::default();

        let began = tokio::time::Instant::now();
        pipeline.run_all(&mut state, inputs(&fields), &AtomicBool::new(false)).await.unwrap();

        let calls = backend.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].0, began);
        for pair in calls.windows(2) {
            let (_, previous_end) = pair[0];
            let (next_start, _) = pair[1];
            assert!(next_start - previous_end >= delay);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_applies_after_failed_call() {
        let delay = Duration::from_millis(500);
        let backend = slow(Duration::from_millis(800), true);
        let definitions = DefinitionSet::from_yaml_str(DEFINITIONS).unwrap();
        let pipeline = Pipeline::new(GenerationAdapter::new(backend.clone()), definitions)
            .with_inter_call_delay(delay);
        let mut state = PipelineState::new(steps());
        let fields = ProjectFields::default();

        assert!(pipeline.execute_step(&mut state, inputs(&fields)).await.is_err());
        pipeline.execute_step(&mut state, inputs(&fields)).await.unwrap();

        let calls = backend.calls.lock().unwrap().clone();
        assert!(calls[1].0 - calls[0].1 >= delay);
    }

    #[tokio::test]
    async fn test_rerun_replaces_record_without_touching_others() {
        let backend = Numbered::new();
        let pipeline = pipeline(backend.clone());
        let mut state = PipelineState::new(steps());
        let fields = ProjectFields::default();
        pipeline.run_all(&mut state, inputs(&fields), &AtomicBool::new(false)).await.unwrap();
        let beta = state.record("beta").unwrap().clone();

        pipeline.rerun_step(&mut state, 0, inputs(&fields)).await.unwrap();

        assert_eq!(state.records()[0].step_id, "alpha");
        assert!(state.records()[0].result.contains("Answer 4."));
        assert_eq!(state.record("beta"), Some(&beta));
        assert!(state.is_complete());
        assert!(!backend.prompts()[3].contains("## [1] Alpha"));
    }

    #[tokio::test]
    async fn test_rerun_requires_record() {
        let pipeline = pipeline(Numbered::new());
        let mut state = PipelineState::new(steps());
        let fields = ProjectFields::default();

        let err = pipeline.rerun_step(&mut state, 1, inputs(&fields)).await.unwrap_err();
        assert!(matches!(err, AnalysisError::StepNotExecuted(id) if id == "beta"));
    }

    #[tokio::test]
    async fn test_exhausted_chain_stores_failure_message() {
        let backend =
            Arc::new(Numbered { prompts: Mutex::new(Vec::new()), fail_on: None, empty: true });
        let pipeline = pipeline(backend);
        let mut state = PipelineState::new(steps()[1..].to_vec());
        let fields = ProjectFields::default();

        pipeline.execute_step(&mut state, inputs(&fields)).await.unwrap();
        let record = state.record("beta").unwrap();
        assert_eq!(record.results[&0].output, GENERATION_FAILED_MESSAGE);
        assert!(!record.result.is_empty());
    }

    #[tokio::test]
    async fn test_undeclared_step_runs_four_default_stages() {
        let backend = Numbered::new();
        let pipeline = pipeline(backend.clone());
        let mut state = PipelineState::new(vec![Step::new(
            "gamma",
            "Gamma",
            "third",
            Tier::Optional,
            3,
            "x",
        )]);
        let fields = ProjectFields::default();

        pipeline.execute_step(&mut state, inputs(&fields)).await.unwrap();
        let record = state.record("gamma").unwrap();
        let labels: Vec<&str> = record.results.values().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, crate::prompt::DEFAULT_SECTIONS.to_vec());
    }
}
