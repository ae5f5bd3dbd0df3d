use std::thread;
use std::time::Duration;

use paging_cache::{ControllerOptions, FetchParams, PageCallback};
use paging_cache_adapter::{RowState, TreeDataSource};

#[derive(Clone, Debug)]
struct Node {
    id: u32,
    name: String,
}

fn fetch(params: FetchParams<Node>, callback: PageCallback<Node>) {
    // Simulated backend: 50 root folders with 4 files each, answered on a worker thread.
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(5));
        let (base, count, label): (u32, usize, String) = match &params.parent_item {
            None => (0, 50, "folder".to_string()),
            Some(parent) if parent.id < 1000 => {
                (1000 + parent.id * 10, 4, format!("{} file", parent.name))
            }
            Some(_) => (0, 0, String::new()),
        };
        let start = (params.page * params.page_size).min(count);
        let end = (start + params.page_size).min(count);
        let items = (start..end).map(|i| Node {
            id: base + i as u32,
            name: format!("{label} {i}"),
        });
        callback.resolve(items, Some(count));
    });
}

fn render(source: &mut TreeDataSource<Node, u32>) {
    for flat_index in source.rendered_range() {
        match source.row(flat_index) {
            RowState::Loaded { item, level } => {
                println!("{flat_index:>3} {}{}", "  ".repeat(level), item.name)
            }
            RowState::Loading => println!("{flat_index:>3} …"),
            RowState::OutOfRange => break,
        }
    }
}

fn pump(source: &mut TreeDataSource<Node, u32>) {
    while source.is_loading() {
        thread::sleep(Duration::from_millis(1));
        source.process_responses();
    }
}

fn main() {
    let mut source = TreeDataSource::new(
        ControllerOptions::new(0, 20).with_data_provider(fetch),
        |node: &Node| node.id,
    );
    source.set_rendered_range(0..8);
    pump(&mut source);
    render(&mut source);

    // Expand folder 1 by id; its files load when the row is rendered.
    let folder = Node {
        id: 1,
        name: String::new(),
    };
    source.expand_item(&folder);
    render(&mut source);
    pump(&mut source);
    println!("refresh rows: {:?}", source.take_rows_to_refresh());
    render(&mut source);

    // Scrolling to a file of a folder that is not loaded yet resolves once its pages arrive.
    source.set_expanded_items([&folder, &Node { id: 42, name: String::new() }]);
    source.scroll_to_index(&[42, 3]);
    pump(&mut source);
    if let Some(target) = source.take_scroll_target() {
        let end = (target + 4).min(source.effective_size());
        source.set_rendered_range(target..end);
        println!("scrolled to {target}");
        render(&mut source);
    }
}
