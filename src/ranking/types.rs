use serde::{Deserialize, Serialize};

use crate::store::operations::comparisons::ComparisonState;
use crate::store::operations::study::Item;

pub type ItemId = u64;
pub type GroupId = u64;
pub type ParticipantId = u64;
pub type ComparisonId = u64;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WeightConfiguration {
    #[default]
    Equal,
    Custom,
    Group,
}

/// Two distinct items in presentation order.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pair {
    pub item_1_id: ItemId,
    pub item_2_id: ItemId,
}

impl Pair {
    /// Order-independent identity of the pair.
    pub fn key(&self) -> (ItemId, ItemId) {
        unordered(self.item_1_id, self.item_2_id)
    }

    pub fn contains(&self, item_id: ItemId) -> bool {
        self.item_1_id == item_id || self.item_2_id == item_id
    }
}

pub fn unordered(a: ItemId, b: ItemId) -> (ItemId, ItemId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Per-visitor state owned by the caller and threaded through every call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub participant_id: ParticipantId,
    pub group_ids: Vec<GroupId>,
    pub weight_conf: WeightConfiguration,
    /// Comparison to replay on the next fresh request (set by "previous").
    pub previous_comparison_id: Option<ComparisonId>,
    /// Comparisons judged in this session, oldest first.
    pub comparison_ids: Vec<ComparisonId>,
}

impl SessionState {
    pub fn new(
        participant_id: ParticipantId,
        group_ids: Vec<GroupId>,
        weight_conf: WeightConfiguration,
    ) -> Self {
        Self {
            participant_id,
            group_ids,
            weight_conf,
            previous_comparison_id: None,
            comparison_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    Continue,
    CycleBoundary,
    HardStop,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DecisionState {
    Confirmed,
    Skipped,
    Tied,
    Rejudged,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DecisionPayload {
    pub state: DecisionState,
    #[serde(default)]
    pub item_1_id: Option<ItemId>,
    #[serde(default)]
    pub item_2_id: Option<ItemId>,
    #[serde(default)]
    pub selected_item_id: Option<ItemId>,
    #[serde(default)]
    pub comparison_id: Option<ComparisonId>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PresentRequest {
    #[serde(default)]
    pub comparison_id: Option<ComparisonId>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PriorDecision {
    pub selected_item_id: Option<ItemId>,
    pub state: ComparisonState,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UiFlags {
    pub allow_skip: bool,
    pub allow_ties: bool,
    pub allow_back: bool,
    /// Back navigation is allowed and there is an earlier comparison to go to.
    pub can_go_back: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PresentedPair {
    pub item_1: Item,
    pub item_2: Item,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    pub status: CycleStatus,
    pub pair: Option<PresentedPair>,
    /// Set when an already stored comparison is shown for rejudging.
    pub comparison_id: Option<ComparisonId>,
    pub prior_decision: Option<PriorDecision>,
    pub ui_flags: UiFlags,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub session: SessionState,
    pub status: CycleStatus,
    /// Comparison written by this submission, if any.
    pub comparison_id: Option<ComparisonId>,
    /// Comparison the caller should display next (pure navigation requests).
    pub redirect_comparison_id: Option<ComparisonId>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ThankYouStatus {
    pub status: CycleStatus,
    pub completed_cycles: u32,
    pub max_cycles: u32,
    pub can_continue: bool,
}
