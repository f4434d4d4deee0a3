/// Converts a backend node path into the flattened logical key exposed to
/// listeners and snapshot readers: the watched root prefix is removed and
/// the remaining `/` separators become `.`.
///
/// `path_to_key("/dubbo/config/service/configurators", "/dubbo/config")`
/// yields `"service.configurators"`. Empty input is returned unchanged.
/// Deterministic and total; never fails.
pub fn path_to_key(path: &str, root: &str) -> String {
    if path.is_empty() {
        return path.to_string();
    }
    path.replace(&format!("{}/", root), "").replace('/', ".")
}
