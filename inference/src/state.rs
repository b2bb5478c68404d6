//! The Historian → Narrator → Checker cycle as an explicit state machine
//! (spec.md §9: "written as a plain state machine ... not implicit
//! control flow"). Grounded on the teacher's `retrieval-pipeline`
//! `StrategyDriver`/`PipelineStage` loop style
//! (`run_with_driver`/`PipelineStageTimings`), generalized from a linear
//! stage list into a branching FSM since the Checker can route back to
//! Narrator instead of only advancing.

/// One node of the inference workflow FSM (spec.md §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Historian,
    Narrator,
    Checker,
    EndOk,
    EndFail,
}
