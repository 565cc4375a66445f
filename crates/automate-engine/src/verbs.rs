//! Wire-stable verb strings understood by hosts.
//!
//! These names are part of the host contract and must not change.

// Gestures.
/// Tap at `[x, y]`.
pub const CLICK: &str = "click";
/// Long-press at `[x, y]`.
pub const LONG_CLICK: &str = "longClick";
/// Press at `[x, y, duration]`.
pub const PRESS: &str = "press";
/// Swipe `[x1, y1, x2, y2, duration]`.
pub const SWIPE: &str = "swipe";
/// Screen-relative swipe up.
pub const SWIPE_UP: &str = "swipeUp";
/// Screen-relative swipe down.
pub const SWIPE_DOWN: &str = "swipeDown";
/// Screen-relative swipe left.
pub const SWIPE_LEFT: &str = "swipeLeft";
/// Screen-relative swipe right.
pub const SWIPE_RIGHT: &str = "swipeRight";
/// One stroke: `[duration, [x, y], ..]` as JSON.
pub const GESTURE: &str = "gesture";
/// Several strokes as a JSON array.
pub const GESTURES: &str = "gestures";
/// Type into the focused field.
pub const SET_TEXT: &str = "setText";

// Global actions.
/// Back button.
pub const BACK: &str = "back";
/// Home button.
pub const HOME: &str = "home";
/// Recent apps.
pub const RECENTS: &str = "recents";
/// Notification shade.
pub const NOTIFICATIONS: &str = "notifications";
/// Quick settings panel.
pub const QUICK_SETTINGS: &str = "quickSettings";

// Apps.
/// Launch by package name.
pub const APP_LAUNCH: &str = "app.launch";
/// Launch by display name.
pub const APP_LAUNCH_APP: &str = "app.launchApp";
/// Foreground package, via `app`.
pub const APP_CURRENT_PACKAGE: &str = "app.currentPackage";
/// Open a URL.
pub const OPEN_URL: &str = "openUrl";
/// Foreground package, global form.
pub const CURRENT_PACKAGE: &str = "currentPackage";

// Device.
/// Battery percentage.
pub const DEVICE_BATTERY: &str = "device.getBattery";
/// Turn the screen on.
pub const DEVICE_WAKE_UP: &str = "device.wakeUp";
/// Screen width in pixels.
pub const DEVICE_WIDTH: &str = "device.width";
/// Screen height in pixels.
pub const DEVICE_HEIGHT: &str = "device.height";

// Selector terminals. The first argument is the condition list as JSON.
/// First match.
pub const SELECTOR_FIND_ONE: &str = "selector.findOne";
/// The `index`-th match, without waiting.
pub const SELECTOR_FIND_ONCE: &str = "selector.findOnce";
/// Every match.
pub const SELECTOR_FIND_ALL: &str = "selector.findAll";
/// First match, waiting up to a timeout.
pub const SELECTOR_WAIT_FOR: &str = "selector.waitFor";
/// Whether anything matches.
pub const SELECTOR_EXISTS: &str = "selector.exists";
/// Click the first match.
pub const SELECTOR_CLICK: &str = "selector.click";
/// Long-click the first match.
pub const SELECTOR_LONG_CLICK: &str = "selector.longClick";
/// Replace the text of the first match.
pub const SELECTOR_SET_TEXT: &str = "selector.setText";
/// Scroll the first match forward.
pub const SELECTOR_SCROLL_FORWARD: &str = "selector.scrollForward";
/// Scroll the first match backward.
pub const SELECTOR_SCROLL_BACKWARD: &str = "selector.scrollBackward";

// Node navigation. The first argument is the node's bounds as JSON.
/// Parent node.
pub const NODE_PARENT: &str = "uiobject.parent";
/// Direct children.
pub const NODE_CHILDREN: &str = "uiobject.children";
/// Descendants matching a condition list.
pub const NODE_FIND: &str = "uiobject.find";
/// Sibling by index.
pub const NODE_SIBLING: &str = "uiobject.sibling";
/// Scroll the node forward.
pub const NODE_SCROLL_FORWARD: &str = "uiobject.scrollForward";
/// Scroll the node backward.
pub const NODE_SCROLL_BACKWARD: &str = "uiobject.scrollBackward";

// Storage. The first argument is the store name.
/// Read a key.
pub const STORAGE_GET: &str = "storage.get";
/// Write a key.
pub const STORAGE_PUT: &str = "storage.put";
/// Delete a key.
pub const STORAGE_REMOVE: &str = "storage.remove";
/// Whether a key is present.
pub const STORAGE_CONTAINS: &str = "storage.contains";
/// Delete every key.
pub const STORAGE_CLEAR: &str = "storage.clear";

// I/O.
/// Run a shell command: `[cmd, root]`.
pub const SHELL: &str = "shell";
/// Read a file as text.
pub const FILES_READ: &str = "files.read";
/// Write a file.
pub const FILES_WRITE: &str = "files.write";
/// HTTP GET.
pub const HTTP_GET: &str = "http.get";
/// HTTP POST of a form.
pub const HTTP_POST_FORM: &str = "http.postForm";

// Misc.
/// Read the clipboard.
pub const GET_CLIP: &str = "getClip";
/// Write the clipboard.
pub const SET_CLIP: &str = "setClip";
/// Show a toast.
pub const TOAST: &str = "toast";
