//! On-demand flattening of the watched subtree.

use std::collections::HashMap;

use crate::path_to_key;
use crate::Snapshot;
use crate::TreeClient;
use crate::TreeNode;

/// Reads the watched subtree from the client's current cached state and
/// flattens every leaf into a logical-key map.
///
/// The tree is assumed to be exactly two levels deep below the watched
/// root: the root's children are listed, then each child's children are
/// flattened. Deeper trees are under-read and shallower leaves are skipped;
/// this mirrors the layout the source was built for and is a deliberate
/// limitation, not subject to silent generalization.
///
/// Unlike the listener stream this read is not depth-filtered, and it is
/// taken against authoritative backend state, so it may run ahead of or
/// behind the most recently dispatched notification.
pub(crate) async fn read_snapshot(client: &dyn TreeClient, watch_root: &str) -> Snapshot {
    let mut all = Snapshot::new();

    let children: HashMap<String, TreeNode> = client.children(watch_root).await;
    for child_name in children.keys() {
        let child_path = format!("{}/{}", watch_root, child_name);
        for (leaf_name, leaf) in client.children(&child_path).await {
            let leaf_path = format!("{}/{}", child_path, leaf_name);
            all.insert(
                path_to_key(&leaf_path, watch_root),
                String::from_utf8_lossy(&leaf.data).into_owned(),
            );
        }
    }

    all
}
