use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::action::ActionKind;

/// Cutscene as written in scene JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutsceneData {
    pub id: String,
    #[serde(default)]
    pub actions: Vec<ActionData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionData {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub wait_previous: bool,
}

/// Static cutscene with parsed action kinds and still-symbolic targets.
#[derive(Debug, Clone, PartialEq)]
pub struct CutsceneScript {
    pub id: String,
    pub actions: Vec<ScriptedAction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedAction {
    pub kind: ActionKind,
    pub target: Option<String>,
    pub data: Value,
    pub wait_previous: bool,
}

impl CutsceneScript {
    pub fn from_data(data: CutsceneData) -> Self {
        let id = data.id;
        let actions = data
            .actions
            .into_iter()
            .enumerate()
            .map(|(index, action)| {
                let kind = ActionKind::parse(&action.action_type);
                if let ActionKind::Invalid(name) = &kind {
                    warn!(
                        cutscene = %id,
                        index,
                        action_type = %name,
                        "cutscene_unknown_action_type"
                    );
                }
                ScriptedAction {
                    kind,
                    target: action.target,
                    data: action.data,
                    wait_previous: action.wait_previous,
                }
            })
            .collect();
        Self { id, actions }
    }
}
