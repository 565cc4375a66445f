//! The chainable selector DSL.
//!
//! A [`Selector`] accumulates [`Condition`]s in call order. Chain methods mutate the shared
//! condition list and hand back the same selector, so `text("OK").clickable(true)` builds a
//! single two-condition query. Terminal operations serialize the list and issue one bridge call.

use std::{fmt, sync::Arc};

use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{
    materialize::Materializer,
    node::{NodeInfo, UiNode},
    regex_cache::RegexCache,
    verbs,
};

/// A node property compared by text-like conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Visible text.
    Text,
    /// Content description.
    Desc,
    /// Resource id.
    Id,
    /// Widget class name.
    ClassName,
    /// Owning package.
    PackageName,
}

/// How a text-like condition compares its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Equal strings.
    Exact,
    /// Substring.
    Contains,
    /// Prefix.
    StartsWith,
    /// Suffix.
    EndsWith,
    /// Whole-string regular expression.
    Matches,
}

/// A boolean node flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    /// Accepts taps.
    Clickable,
    /// Accepts long presses.
    LongClickable,
    /// Scrolls.
    Scrollable,
    /// Enabled.
    Enabled,
    /// Checked.
    Checked,
    /// Selected.
    Selected,
    /// Can take focus.
    Focusable,
    /// Has focus.
    Focused,
    /// Can be checked.
    Checkable,
    /// Accepts text input.
    Editable,
    /// On screen.
    VisibleToUser,
}

/// The broad shape of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Compare a string property.
    Text(Field, MatchMode),
    /// Compare a boolean flag.
    Flag(Flag),
    /// Compare the tree depth.
    Depth,
    /// Compare the drawing order.
    DrawingOrder,
}

macro_rules! condition_kinds {
    ($($variant:ident => $name:literal = $shape:expr,)*) => {
        /// Every condition a selector can carry. The wire name doubles as the script method name.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ConditionKind {
            $(
                #[doc = concat!("`", $name, "`")]
                $variant,
            )*
        }

        impl ConditionKind {
            /// All kinds in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)*];

            /// Wire and script name.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }

            /// Parse a wire name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// What the condition compares.
            pub fn shape(self) -> Shape {
                use self::{Field::*, Flag::*, MatchMode::*};
                match self {
                    $(Self::$variant => $shape,)*
                }
            }
        }
    };
}

condition_kinds! {
    Text => "text" = Shape::Text(Field::Text, Exact),
    TextContains => "textContains" = Shape::Text(Field::Text, Contains),
    TextStartsWith => "textStartsWith" = Shape::Text(Field::Text, StartsWith),
    TextEndsWith => "textEndsWith" = Shape::Text(Field::Text, EndsWith),
    TextMatches => "textMatches" = Shape::Text(Field::Text, Matches),
    Desc => "desc" = Shape::Text(Desc, Exact),
    DescContains => "descContains" = Shape::Text(Desc, Contains),
    DescStartsWith => "descStartsWith" = Shape::Text(Desc, StartsWith),
    DescEndsWith => "descEndsWith" = Shape::Text(Desc, EndsWith),
    DescMatches => "descMatches" = Shape::Text(Desc, Matches),
    Id => "id" = Shape::Text(Id, Exact),
    IdContains => "idContains" = Shape::Text(Id, Contains),
    IdStartsWith => "idStartsWith" = Shape::Text(Id, StartsWith),
    IdEndsWith => "idEndsWith" = Shape::Text(Id, EndsWith),
    IdMatches => "idMatches" = Shape::Text(Id, Matches),
    ClassName => "className" = Shape::Text(ClassName, Exact),
    ClassNameContains => "classNameContains" = Shape::Text(ClassName, Contains),
    ClassNameStartsWith => "classNameStartsWith" = Shape::Text(ClassName, StartsWith),
    ClassNameEndsWith => "classNameEndsWith" = Shape::Text(ClassName, EndsWith),
    ClassNameMatches => "classNameMatches" = Shape::Text(ClassName, Matches),
    PackageName => "packageName" = Shape::Text(PackageName, Exact),
    PackageNameContains => "packageNameContains" = Shape::Text(PackageName, Contains),
    PackageNameStartsWith => "packageNameStartsWith" = Shape::Text(PackageName, StartsWith),
    PackageNameEndsWith => "packageNameEndsWith" = Shape::Text(PackageName, EndsWith),
    PackageNameMatches => "packageNameMatches" = Shape::Text(PackageName, Matches),
    Clickable => "clickable" = Shape::Flag(Clickable),
    LongClickable => "longClickable" = Shape::Flag(LongClickable),
    Scrollable => "scrollable" = Shape::Flag(Scrollable),
    Enabled => "enabled" = Shape::Flag(Enabled),
    Checked => "checked" = Shape::Flag(Checked),
    Selected => "selected" = Shape::Flag(Selected),
    Focusable => "focusable" = Shape::Flag(Focusable),
    Focused => "focused" = Shape::Flag(Focused),
    Checkable => "checkable" = Shape::Flag(Checkable),
    Editable => "editable" = Shape::Flag(Editable),
    VisibleToUser => "visibleToUser" = Shape::Flag(VisibleToUser),
    Depth => "depth" = Shape::Depth,
    DrawingOrder => "drawingOrder" = Shape::DrawingOrder,
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ConditionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ConditionKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::from_name(&name)
            .ok_or_else(|| de::Error::custom(format!("unknown condition type: {name}")))
    }
}

/// One `{type, value}` match criterion. Values always travel as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// What to compare.
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    /// Comparison operand.
    pub value: String,
}

impl Condition {
    /// Build a condition.
    pub fn new(kind: ConditionKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Evaluate this condition against a node descriptor.
    pub fn matches(&self, node: &NodeInfo, regexes: &RegexCache) -> bool {
        match self.kind.shape() {
            Shape::Text(field, mode) => {
                let actual = node.field(field);
                let want = self.value.as_str();
                match mode {
                    MatchMode::Exact => actual == want || suffix_alias(field, actual, want),
                    MatchMode::Contains => actual.contains(want),
                    MatchMode::StartsWith => actual.starts_with(want),
                    MatchMode::EndsWith => actual.ends_with(want),
                    MatchMode::Matches => regexes.is_full_match(want, actual),
                }
            }
            Shape::Flag(flag) => node.flag(flag) == (self.value == "true"),
            Shape::Depth => self.value.parse::<i64>().ok() == Some(node.depth),
            Shape::DrawingOrder => self.value.parse::<i64>().ok() == Some(node.drawing_order),
        }
    }
}

/// Short forms accepted by exact id and class name conditions: `id("title")` matches
/// `com.app:id/title`, `className("Button")` matches `android.widget.Button`.
fn suffix_alias(field: Field, actual: &str, want: &str) -> bool {
    if want.is_empty() {
        return false;
    }
    match field {
        Field::Id => actual
            .strip_suffix(want)
            .is_some_and(|head| head.ends_with(":id/")),
        Field::ClassName => actual.strip_suffix(want).is_some_and(|head| head.ends_with('.')),
        _ => false,
    }
}

/// A shared, chainable condition list bound to a host bridge.
///
/// Cloning a selector shares its identity: a condition pushed through any clone is seen by all.
#[derive(Clone)]
pub struct Selector {
    /// Ordered conditions.
    conditions: Arc<Mutex<Vec<Condition>>>,
    /// Bridge and node construction for terminal operations.
    nodes: Materializer,
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("conditions", &self.conditions())
            .finish()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

impl Selector {
    /// An empty selector.
    pub fn new(nodes: Materializer) -> Self {
        Self {
            conditions: Arc::new(Mutex::new(Vec::new())),
            nodes,
        }
    }

    /// Append a condition and return the same selector.
    pub fn push(&self, kind: ConditionKind, value: impl Into<String>) -> Self {
        self.conditions.lock().push(Condition::new(kind, value));
        self.clone()
    }

    /// Append a boolean flag condition.
    pub fn flag(&self, kind: ConditionKind, on: bool) -> Self {
        self.push(kind, if on { "true" } else { "false" })
    }

    /// Append an integer condition.
    pub fn number(&self, kind: ConditionKind, n: i64) -> Self {
        self.push(kind, n.to_string())
    }

    /// Snapshot of the condition list.
    pub fn conditions(&self) -> Vec<Condition> {
        self.conditions.lock().clone()
    }

    /// Number of conditions.
    pub fn len(&self) -> usize {
        self.conditions.lock().len()
    }

    /// Whether no condition has been added.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `other` is a handle to this same selector.
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.conditions, &other.conditions)
    }

    /// Canonical wire form: `[{"type":..,"value":..},..]` in insertion order.
    pub fn to_json(&self) -> String {
        let conditions = self.conditions.lock();
        serde_json::to_string(&*conditions).unwrap_or_else(|_| "[]".to_string())
    }

    /// Whether every condition holds for `node`. Evaluated locally, without the host.
    pub fn matches(&self, node: &NodeInfo, regexes: &RegexCache) -> bool {
        self.conditions.lock().iter().all(|c| c.matches(node, regexes))
    }

    /// Bridge arguments: condition JSON followed by `extra`.
    fn args(&self, extra: &[String]) -> Vec<String> {
        let mut args = Vec::with_capacity(1 + extra.len());
        args.push(self.to_json());
        args.extend_from_slice(extra);
        args
    }

    /// First matching node, or `None`.
    pub fn find_one(&self) -> Option<UiNode> {
        let raw = self.nodes.bridge().call(verbs::SELECTOR_FIND_ONE, &self.args(&[]));
        self.nodes.one(verbs::SELECTOR_FIND_ONE, raw)
    }

    /// The `index`-th matching node of the current screen, without waiting.
    pub fn find_once(&self, index: i64) -> Option<UiNode> {
        let raw = self
            .nodes
            .bridge()
            .call(verbs::SELECTOR_FIND_ONCE, &self.args(&[index.to_string()]));
        self.nodes.one(verbs::SELECTOR_FIND_ONCE, raw)
    }

    /// All matching nodes. Absent or malformed host output yields an empty list.
    pub fn find_all(&self) -> Vec<UiNode> {
        let raw = self.nodes.bridge().call(verbs::SELECTOR_FIND_ALL, &self.args(&[]));
        self.nodes.many(verbs::SELECTOR_FIND_ALL, raw)
    }

    /// Ask the host to wait up to `timeout_ms` for a match. Exactly one bridge call is issued.
    pub fn wait_for(&self, timeout_ms: i64) -> Option<UiNode> {
        let raw = self
            .nodes
            .bridge()
            .call(verbs::SELECTOR_WAIT_FOR, &self.args(&[timeout_ms.to_string()]));
        self.nodes.one(verbs::SELECTOR_WAIT_FOR, raw)
    }

    /// Whether any node matches.
    pub fn exists(&self) -> bool {
        self.call_bool(verbs::SELECTOR_EXISTS, &[])
    }

    /// Tap the first match.
    pub fn click(&self) -> bool {
        self.call_bool(verbs::SELECTOR_CLICK, &[])
    }

    /// Long-press the first match.
    pub fn long_click(&self) -> bool {
        self.call_bool(verbs::SELECTOR_LONG_CLICK, &[])
    }

    /// Replace the text of the first match.
    pub fn set_text(&self, text: &str) -> bool {
        self.call_bool(verbs::SELECTOR_SET_TEXT, &[text.to_string()])
    }

    /// Scroll the first match forward.
    pub fn scroll_forward(&self) -> bool {
        self.call_bool(verbs::SELECTOR_SCROLL_FORWARD, &[])
    }

    /// Scroll the first match backward.
    pub fn scroll_backward(&self) -> bool {
        self.call_bool(verbs::SELECTOR_SCROLL_BACKWARD, &[])
    }

    /// Issue a boolean-shaped selector verb.
    fn call_bool(&self, verb: &str, extra: &[String]) -> bool {
        self.nodes.bridge().call_bool(verb, &self.args(extra))
    }
}
