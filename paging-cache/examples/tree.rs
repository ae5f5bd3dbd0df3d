use std::collections::HashSet;
use std::sync::Arc;

use paging_cache::{ControllerOptions, DataProviderController, FetchParams, LAST, PageCallback};

fn children(params: FetchParams<String>, callback: PageCallback<String>) {
    // Every node has three children, three levels deep.
    let (prefix, count) = match &params.parent_item {
        None => (String::new(), 3),
        Some(parent) if parent.len() < 5 => (format!("{parent}."), 3),
        Some(_) => (String::new(), 0),
    };
    let start = params.page * params.page_size;
    let end = (start + params.page_size).min(count);
    callback.resolve((start..end).map(|i| format!("{prefix}{i}")), Some(count));
}

fn main() {
    let expanded: Arc<HashSet<String>> =
        Arc::new(["1", "1.2", "2"].into_iter().map(String::from).collect());
    let mut c: DataProviderController<String> = DataProviderController::new(
        ControllerOptions::new(3, 2)
            .with_is_expanded(move |item: &String| expanded.contains(item))
            .with_data_provider(children),
    );

    // Loading rows may reveal more rows, so walk until the flattened size settles.
    let mut seen = 0;
    while seen != c.effective_size() {
        seen = c.effective_size();
        for flat_index in 0..seen {
            c.ensure_flat_index_loaded(flat_index);
            c.ensure_flat_index_children_loaded(flat_index);
        }
    }

    for flat_index in 0..c.effective_size() {
        let info = c.flat_index_info(flat_index);
        let indent = "  ".repeat(info.level);
        println!("{flat_index:>2} {indent}{}", info.item.map_or("…", String::as_str));
    }

    println!("[1, 2, LAST] -> {}", c.flat_index_by_path(&[1, 2, LAST]));
}
