/// Deletion retraction: a removed log is neither re-indexed nor returned
/// from search, whether it was pending, in flight, or already committed.
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{GateLoader, StaticLoader, id, plugin_with_loader};

const SETTLE: Duration = Duration::from_secs(10);

#[test]
fn test_remove_pending_marker() {
    let loader = Arc::new(StaticLoader::new());
    let x = id("acct/bob/x.log");
    loader.insert(&x, "should never appear");

    let (plugin, _logs, _index) = plugin_with_loader(Arc::clone(&loader) as _);
    plugin.pause_indexing();
    plugin.mark_dirty(x.clone());
    plugin.start().unwrap();

    plugin.remove_paths_from_index(std::slice::from_ref(&x));
    assert!(!plugin.is_dirty(&x));

    plugin.resume_indexing();
    assert!(plugin.wait_until_idle(SETTLE));
    assert_eq!(loader.load_count(&x), 0);
    assert!(plugin.search("appear").is_empty());
    plugin.shutdown();
}

#[test]
fn test_remove_committed_document() {
    let loader = Arc::new(StaticLoader::new());
    let x = id("acct/bob/x.log");
    loader.insert(&x, "committed then removed");

    let (plugin, _logs, _index) = plugin_with_loader(Arc::clone(&loader) as _);
    plugin.mark_dirty(x.clone());
    plugin.start().unwrap();
    assert!(plugin.wait_until_idle(SETTLE));
    assert_eq!(plugin.search("committed"), vec![x.clone()]);

    plugin.remove_paths_from_index(std::slice::from_ref(&x));
    assert!(plugin.search("committed").is_empty());
    assert!(!plugin.is_dirty(&x));
    plugin.shutdown();
}

#[test]
fn test_remove_while_in_flight() {
    let x = id("acct/bob/x.log");
    let (loader, entered_rx, permit_tx) = GateLoader::new(&[(&x, "in flight content")]);

    let (plugin, _logs, _index) = plugin_with_loader(loader as _);
    plugin.mark_dirty(x.clone());
    plugin.start().unwrap();

    // The worker is blocked inside the load for x; retract it now
    assert_eq!(entered_rx.recv().unwrap(), x);
    plugin.remove_paths_from_index(std::slice::from_ref(&x));
    permit_tx.send(()).unwrap();

    assert!(plugin.wait_until_idle(SETTLE));
    assert!(plugin.search("flight").is_empty());
    assert!(!plugin.is_dirty(&x));
    plugin.shutdown();
}

#[test]
fn test_removed_then_remarked_is_live_again() {
    let loader = Arc::new(StaticLoader::new());
    let x = id("acct/bob/x.log");
    loader.insert(&x, "recreated content");

    let (plugin, _logs, _index) = plugin_with_loader(Arc::clone(&loader) as _);
    plugin.pause_indexing();
    plugin.mark_dirty(x.clone());
    plugin.remove_paths_from_index(std::slice::from_ref(&x));

    // The log was recreated afterwards
    plugin.mark_dirty(x.clone());
    plugin.start().unwrap();
    plugin.resume_indexing();

    assert!(plugin.wait_until_idle(SETTLE));
    assert_eq!(plugin.search("recreated"), vec![x]);
    plugin.shutdown();
}
