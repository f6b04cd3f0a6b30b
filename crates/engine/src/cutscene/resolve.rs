use serde_json::Value;
use thiserror::Error;

use crate::actor::Direction;
use crate::geometry::Vec2;

use super::action::{Action, ActionKind, Payload, PayloadKind, TargetKind, TargetRef};
use super::script::ScriptedAction;

/// Maps a symbolic script target (`"player"`, an NPC name, ...) to a live handle.
pub trait TargetResolver {
    fn resolve(&self, symbol: &str) -> Option<TargetRef>;
}

/// One authoring mistake in a cutscene script.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptDefect {
    #[error("action {index}: unknown action type '{name}'")]
    UnknownActionType { index: usize, name: String },
    #[error("action {index} ({kind}): missing target")]
    MissingTarget { index: usize, kind: String },
    #[error("action {index} ({kind}): target '{symbol}' does not resolve")]
    UnresolvedTarget {
        index: usize,
        kind: String,
        symbol: String,
    },
    #[error("action {index} ({kind}): expected {expected} target, found {found}")]
    TargetKindMismatch {
        index: usize,
        kind: String,
        expected: TargetKind,
        found: TargetKind,
    },
    #[error("action {index} ({kind}): expected {expected} payload, found {found}")]
    PayloadKindMismatch {
        index: usize,
        kind: String,
        expected: PayloadKind,
        found: &'static str,
    },
}

impl ScriptDefect {
    pub fn index(&self) -> usize {
        match self {
            Self::UnknownActionType { index, .. }
            | Self::MissingTarget { index, .. }
            | Self::UnresolvedTarget { index, .. }
            | Self::TargetKindMismatch { index, .. }
            | Self::PayloadKindMismatch { index, .. } => *index,
        }
    }
}

pub fn resolve_action(
    index: usize,
    scripted: &ScriptedAction,
    resolver: &dyn TargetResolver,
) -> Action {
    let defective = |defect: ScriptDefect| Action {
        kind: scripted.kind.clone(),
        target: TargetRef::None,
        payload: Payload::None,
        wait_previous: scripted.wait_previous,
        defect: Some(defect),
    };

    let Some((target_kind, payload_kind)) = scripted.kind.requirements() else {
        return defective(ScriptDefect::UnknownActionType {
            index,
            name: scripted.kind.name().to_string(),
        });
    };

    let target = match resolve_target(
        index,
        &scripted.kind,
        target_kind,
        scripted.target.as_deref(),
        resolver,
    ) {
        Ok(target) => target,
        Err(defect) => return defective(defect),
    };

    let Some(payload) = coerce_payload(payload_kind, &scripted.data) else {
        return defective(ScriptDefect::PayloadKindMismatch {
            index,
            kind: scripted.kind.name().to_string(),
            expected: payload_kind,
            found: json_kind(&scripted.data),
        });
    };

    Action {
        kind: scripted.kind.clone(),
        target,
        payload,
        wait_previous: scripted.wait_previous,
        defect: None,
    }
}

fn resolve_target(
    index: usize,
    kind: &ActionKind,
    expected: TargetKind,
    symbol: Option<&str>,
    resolver: &dyn TargetResolver,
) -> Result<TargetRef, ScriptDefect> {
    if expected == TargetKind::None {
        return Ok(TargetRef::None);
    }
    let symbol = symbol.ok_or_else(|| ScriptDefect::MissingTarget {
        index,
        kind: kind.name().to_string(),
    })?;
    let target = resolver
        .resolve(symbol)
        .ok_or_else(|| ScriptDefect::UnresolvedTarget {
            index,
            kind: kind.name().to_string(),
            symbol: symbol.to_string(),
        })?;
    if target.kind() != expected {
        return Err(ScriptDefect::TargetKindMismatch {
            index,
            kind: kind.name().to_string(),
            expected,
            found: target.kind(),
        });
    }
    Ok(target)
}

/// Converts raw script data into the payload an action kind expects.
///
/// Lists keep only their string items. Tick counts must be non-negative integers.
pub fn coerce_payload(expected: PayloadKind, raw: &Value) -> Option<Payload> {
    match expected {
        PayloadKind::None => Some(Payload::None),
        PayloadKind::Point => {
            let object = raw.as_object()?;
            let x = object.get("x")?.as_f64()?;
            let y = object.get("y")?.as_f64()?;
            Some(Payload::Point(Vec2::new(x as f32, y as f32)))
        }
        PayloadKind::Direction => raw
            .as_str()
            .and_then(Direction::parse)
            .map(Payload::Direction),
        PayloadKind::Text => raw.as_str().map(|text| Payload::Text(text.to_string())),
        PayloadKind::Step => {
            let step = raw.as_f64()?;
            step.is_finite().then_some(Payload::Step(step as f32))
        }
        PayloadKind::Lines => {
            let items = raw.as_array()?;
            Some(Payload::Lines(
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
            ))
        }
        PayloadKind::Ticks => {
            if let Some(ticks) = raw.as_u64() {
                return u32::try_from(ticks).ok().map(Payload::Ticks);
            }
            let ticks = raw.as_f64()?;
            (ticks >= 0.0 && ticks.fract() == 0.0 && ticks <= u32::MAX as f64)
                .then_some(Payload::Ticks(ticks as u32))
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
