use serde::{Deserialize, Serialize};

use crate::record::Model;

use super::TargetingCriterion;

/// Targeting attached to a line item: which inventory, audiences and contexts get served.
///
/// Each dimension is an independent criterion; absent dimensions serialize as `null`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct TargetingData {
    pub inventory: Option<TargetingCriterion>,
    pub geography: Option<TargetingCriterion>,
    pub day_part: Option<TargetingCriterion>,
    pub user_domain: Option<TargetingCriterion>,
    pub technology: Option<TargetingCriterion>,
    pub video_content: Option<TargetingCriterion>,
    pub video_position: Option<TargetingCriterion>,
    pub custom: Option<TargetingCriterion>,
}

impl Model for TargetingData {
    const TYPE_NAME: &'static str = "TargetingData";
}
