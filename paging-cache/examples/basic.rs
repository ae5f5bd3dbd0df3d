use std::thread;
use std::time::Duration;

use paging_cache::{ControllerOptions, DataEvent, DataProviderController};

fn main() {
    // Example: a flat list of one million rows, fetched page by page on worker threads.
    //
    // The provider hands each page callback to a thread; the controller applies the responses
    // whenever the host calls `process_responses` on its own thread.
    let mut c: DataProviderController<String> = DataProviderController::new(
        ControllerOptions::new(1_000_000, 50).with_data_provider(|params, callback| {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                let start = params.page * params.page_size;
                let items = (start..start + params.page_size).map(|i| format!("row {i}"));
                callback.resolve(items, None);
            });
        }),
    );
    c.add_listener(|event| {
        if let DataEvent::PageLoaded { page, .. } = event {
            println!("page {page} loaded");
        }
    });

    // A viewport showing rows 123_440..123_470 straddles two pages.
    for flat_index in 123_440..123_470 {
        c.ensure_flat_index_loaded(flat_index);
    }
    println!("loading={}", c.is_loading());

    while c.is_loading() {
        c.process_responses();
        thread::sleep(Duration::from_millis(1));
    }

    let info = c.flat_index_info(123_456);
    println!("item={:?} page={} level={}", info.item, info.page, info.level);
}
