//! Host node descriptors and the script-facing node handle.

use std::{fmt, sync::Arc, thread};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{
    materialize::Materializer,
    selector::{Field, Flag, Selector},
    verbs,
};

/// Screen rectangle of a node, in host pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bounds {
    /// Left edge.
    #[serde(deserialize_with = "lenient_int")]
    pub left: i64,
    /// Top edge.
    #[serde(deserialize_with = "lenient_int")]
    pub top: i64,
    /// Right edge.
    #[serde(deserialize_with = "lenient_int")]
    pub right: i64,
    /// Bottom edge.
    #[serde(deserialize_with = "lenient_int")]
    pub bottom: i64,
}

impl Bounds {
    /// Construct from edges.
    pub fn new(left: i64, top: i64, right: i64, bottom: i64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Horizontal center, rounded toward zero.
    pub fn center_x(&self) -> i64 {
        midpoint(self.left, self.right)
    }

    /// Vertical center, rounded toward zero.
    pub fn center_y(&self) -> i64 {
        midpoint(self.top, self.bottom)
    }

    /// Width, saturating at the `i64` range.
    pub fn width(&self) -> i64 {
        self.right.saturating_sub(self.left)
    }

    /// Height, saturating at the `i64` range.
    pub fn height(&self) -> i64 {
        self.bottom.saturating_sub(self.top)
    }

    /// The lookup key sent with node navigation verbs.
    pub fn to_json(&self) -> String {
        format!(
            r#"{{"left":{},"top":{},"right":{},"bottom":{}}}"#,
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Mean of `a` and `b`, rounded toward zero. Never overflows.
fn midpoint(a: i64, b: i64) -> i64 {
    // Half the sum of two i64 values is always back in range.
    ((i128::from(a) + i128::from(b)) / 2) as i64
}

/// A UI element as described by the host.
///
/// Hosts prefix most keys with an underscore (`_text`, `_id`); the plain names are accepted
/// too. Missing or `null` fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeInfo {
    /// Visible text.
    #[serde(rename = "_text", alias = "text", deserialize_with = "or_default")]
    pub text: String,
    /// Resource id, e.g. `com.app:id/title`.
    #[serde(rename = "_id", alias = "id", deserialize_with = "or_default")]
    pub id: String,
    /// Widget class name.
    #[serde(rename = "_className", alias = "className", deserialize_with = "or_default")]
    pub class_name: String,
    /// Content description.
    #[serde(rename = "_desc", alias = "desc", deserialize_with = "or_default")]
    pub desc: String,
    /// Owning package.
    #[serde(
        rename = "_packageName",
        alias = "packageName",
        deserialize_with = "or_default"
    )]
    pub package_name: String,
    /// Screen rectangle.
    #[serde(deserialize_with = "or_default")]
    pub bounds: Bounds,
    /// Position among siblings, -1 when unknown.
    #[serde(
        rename = "_indexInParent",
        alias = "indexInParent",
        deserialize_with = "lenient_index"
    )]
    pub index_in_parent: i64,
    /// Depth in the tree.
    #[serde(rename = "_depth", alias = "depth", deserialize_with = "lenient_int")]
    pub depth: i64,
    /// Z order among siblings.
    #[serde(
        rename = "_drawingOrder",
        alias = "drawingOrder",
        deserialize_with = "lenient_int"
    )]
    pub drawing_order: i64,
    /// Number of children the host reported.
    #[serde(rename = "childCount", alias = "_childCount", deserialize_with = "lenient_int")]
    pub child_count: i64,
    /// Accepts taps.
    #[serde(deserialize_with = "or_default")]
    pub clickable: bool,
    /// Accepts long presses.
    #[serde(rename = "longClickable", deserialize_with = "or_default")]
    pub long_clickable: bool,
    /// Scrolls.
    #[serde(deserialize_with = "or_default")]
    pub scrollable: bool,
    /// Enabled.
    #[serde(deserialize_with = "or_default")]
    pub enabled: bool,
    /// Checked.
    #[serde(deserialize_with = "or_default")]
    pub checked: bool,
    /// Selected.
    #[serde(deserialize_with = "or_default")]
    pub selected: bool,
    /// Can take focus.
    #[serde(deserialize_with = "or_default")]
    pub focusable: bool,
    /// Has focus.
    #[serde(deserialize_with = "or_default")]
    pub focused: bool,
    /// Can be checked.
    #[serde(deserialize_with = "or_default")]
    pub checkable: bool,
    /// Accepts text input.
    #[serde(deserialize_with = "or_default")]
    pub editable: bool,
    /// On screen.
    #[serde(rename = "visibleToUser", deserialize_with = "or_default")]
    pub visible_to_user: bool,
    /// Descendants embedded in the descriptor. Malformed entries are dropped.
    #[serde(
        rename = "_children",
        alias = "children",
        deserialize_with = "lenient_children",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub children: Vec<NodeInfo>,
}

impl Default for NodeInfo {
    fn default() -> Self {
        Self {
            text: String::new(),
            id: String::new(),
            class_name: String::new(),
            desc: String::new(),
            package_name: String::new(),
            bounds: Bounds::default(),
            index_in_parent: -1,
            depth: 0,
            drawing_order: 0,
            child_count: 0,
            clickable: false,
            long_clickable: false,
            scrollable: false,
            enabled: false,
            checked: false,
            selected: false,
            focusable: false,
            focused: false,
            checkable: false,
            editable: false,
            visible_to_user: false,
            children: Vec::new(),
        }
    }
}

impl NodeInfo {
    /// Description when present, otherwise text.
    pub fn content(&self) -> &str {
        if self.desc.is_empty() {
            &self.text
        } else {
            &self.desc
        }
    }

    /// String property by selector field.
    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Text => &self.text,
            Field::Desc => &self.desc,
            Field::Id => &self.id,
            Field::ClassName => &self.class_name,
            Field::PackageName => &self.package_name,
        }
    }

    /// Boolean property by selector flag.
    pub fn flag(&self, flag: Flag) -> bool {
        match flag {
            Flag::Clickable => self.clickable,
            Flag::LongClickable => self.long_clickable,
            Flag::Scrollable => self.scrollable,
            Flag::Enabled => self.enabled,
            Flag::Checked => self.checked,
            Flag::Selected => self.selected,
            Flag::Focusable => self.focusable,
            Flag::Focused => self.focused,
            Flag::Checkable => self.checkable,
            Flag::Editable => self.editable,
            Flag::VisibleToUser => self.visible_to_user,
        }
    }
}

/// Treat `null` as the type's default.
fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Integer that a host may send as a float or `null` (0).
fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    // Float-to-int `as` clamps to the i64 range and maps NaN to zero.
    Ok(Option::<f64>::deserialize(deserializer)?.map_or(0, |v| v as i64))
}

/// Like [`lenient_int`], but `null` means "unknown" (-1).
fn lenient_index<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.map_or(-1, |v| v as i64))
}

/// Child descriptors; entries that do not describe a node are skipped.
fn lenient_children<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<NodeInfo>, D::Error> {
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect())
}

/// A materialized node: a descriptor plus the operations scripts call on it.
///
/// A node has no identity beyond its bounds. Navigation re-queries the host with the bounds as
/// the key, so if the screen changed since the node was captured the host may answer with a
/// different node or none.
#[derive(Clone)]
pub struct UiNode {
    /// Immutable descriptor.
    info: Arc<NodeInfo>,
    /// Bridge and settings for follow-up calls.
    nodes: Materializer,
}

impl fmt::Debug for UiNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UiNode").field(&self.info).finish()
    }
}

impl fmt::Display for UiNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.info.bounds;
        write!(
            f,
            "UiNode(className={:?}, text={:?}, id={:?}, desc={:?}, bounds=[{},{},{},{}])",
            self.info.class_name, self.info.text, self.info.id, self.info.desc, b.left, b.top, b.right, b.bottom
        )
    }
}

impl UiNode {
    /// Wrap a descriptor.
    pub(crate) fn new(info: NodeInfo, nodes: Materializer) -> Self {
        Self {
            info: Arc::new(info),
            nodes,
        }
    }

    /// The underlying descriptor.
    pub fn info(&self) -> &NodeInfo {
        &self.info
    }

    /// Screen rectangle.
    pub fn bounds(&self) -> Bounds {
        self.info.bounds
    }

    /// Tap the center of the node.
    pub fn click(&self) -> bool {
        self.click_bounds(0, 0)
    }

    /// Tap the center of the node shifted by `(dx, dy)`.
    pub fn click_bounds(&self, dx: i64, dy: i64) -> bool {
        let b = self.info.bounds;
        self.tap(
            verbs::CLICK,
            b.center_x().saturating_add(dx),
            b.center_y().saturating_add(dy),
        )
    }

    /// Long-press the center of the node.
    pub fn long_click(&self) -> bool {
        let b = self.info.bounds;
        self.tap(verbs::LONG_CLICK, b.center_x(), b.center_y())
    }

    /// Focus the node by tapping it, let the UI settle, then type `text`.
    pub fn set_text(&self, text: &str) -> bool {
        self.click();
        thread::sleep(self.nodes.settle_delay());
        self.nodes
            .bridge()
            .call_bool(verbs::SET_TEXT, &[text.to_string()])
    }

    /// The parent node.
    pub fn parent(&self) -> Option<Self> {
        self.nav_one(verbs::NODE_PARENT, &[])
    }

    /// Direct children, freshly queried.
    pub fn children(&self) -> Vec<Self> {
        self.nav_many(verbs::NODE_CHILDREN, &[])
    }

    /// The `index`-th direct child.
    pub fn child(&self, index: i64) -> Option<Self> {
        let index = usize::try_from(index).ok()?;
        self.children().into_iter().nth(index)
    }

    /// First direct child.
    pub fn first_child(&self) -> Option<Self> {
        self.children().into_iter().next()
    }

    /// Last direct child.
    pub fn last_child(&self) -> Option<Self> {
        self.children().pop()
    }

    /// Sibling at `index` under the same parent. The host resolves negative indices.
    pub fn sibling(&self, index: i64) -> Option<Self> {
        self.nav_one(verbs::NODE_SIBLING, &[index.to_string()])
    }

    /// The following sibling, when the position is known.
    pub fn next_sibling(&self) -> Option<Self> {
        let at = self.info.index_in_parent;
        if at < 0 {
            return None;
        }
        self.sibling(at.checked_add(1)?)
    }

    /// The preceding sibling, when the position is known.
    pub fn previous_sibling(&self) -> Option<Self> {
        let at = self.info.index_in_parent;
        if at < 1 {
            return None;
        }
        self.sibling(at - 1)
    }

    /// Descendants matching `selector`.
    pub fn find(&self, selector: &Selector) -> Vec<Self> {
        self.nav_many(verbs::NODE_FIND, &[selector.to_json()])
    }

    /// First descendant matching `selector`.
    pub fn find_one(&self, selector: &Selector) -> Option<Self> {
        self.find(selector).into_iter().next()
    }

    /// Scroll this node forward.
    pub fn scroll_forward(&self) -> bool {
        self.nav_bool(verbs::NODE_SCROLL_FORWARD)
    }

    /// Scroll this node backward.
    pub fn scroll_backward(&self) -> bool {
        self.nav_bool(verbs::NODE_SCROLL_BACKWARD)
    }

    /// Children embedded in the original descriptor, without a host round trip.
    pub fn cached_children(&self) -> Vec<Self> {
        self.info
            .children
            .iter()
            .map(|child| self.nodes.node(child.clone()))
            .collect()
    }

    /// Issue a coordinate gesture verb.
    fn tap(&self, verb: &str, x: i64, y: i64) -> bool {
        self.nodes
            .bridge()
            .call_bool(verb, &[x.to_string(), y.to_string()])
    }

    /// Bridge arguments for navigation: bounds key followed by `extra`.
    fn nav_args(&self, extra: &[String]) -> Vec<String> {
        let mut args = Vec::with_capacity(1 + extra.len());
        args.push(self.info.bounds.to_json());
        args.extend_from_slice(extra);
        args
    }

    /// Navigation verb answering one node.
    fn nav_one(&self, verb: &str, extra: &[String]) -> Option<Self> {
        let raw = self.nodes.bridge().call(verb, &self.nav_args(extra));
        self.nodes.one(verb, raw)
    }

    /// Navigation verb answering a node list.
    fn nav_many(&self, verb: &str, extra: &[String]) -> Vec<Self> {
        let raw = self.nodes.bridge().call(verb, &self.nav_args(extra));
        self.nodes.many(verb, raw)
    }

    /// Navigation verb answering a boolean.
    fn nav_bool(&self, verb: &str) -> bool {
        self.nodes.bridge().call_bool(verb, &self.nav_args(&[]))
    }
}
