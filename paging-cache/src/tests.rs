use crate::*;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Clone, Copy, Debug)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    fn gen_bool(&mut self) -> bool {
        (self.next_u64() >> 33) & 1 == 1
    }
}

type Requests<T> = Arc<Mutex<Vec<(FetchParams<T>, PageCallback<T>)>>>;

/// A controller whose provider parks every request until the test resolves it.
fn recording(
    options: ControllerOptions<&'static str>,
) -> (DataProviderController<&'static str>, Requests<&'static str>) {
    let requests: Requests<&'static str> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&requests);
    let controller = DataProviderController::new(options.with_data_provider(
        move |params, callback| {
            sink.lock().unwrap().push((params, callback));
        },
    ));
    (controller, requests)
}

fn take_request(
    requests: &Requests<&'static str>,
) -> (FetchParams<&'static str>, PageCallback<&'static str>) {
    let mut requests = requests.lock().unwrap();
    assert!(!requests.is_empty(), "expected a pending request");
    requests.remove(0)
}

fn collect_events(
    controller: &mut DataProviderController<&'static str>,
) -> Arc<Mutex<Vec<DataEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    controller.add_listener(move |event| sink.lock().unwrap().push(*event));
    events
}

fn letters(params: FetchParams<&'static str>, callback: PageCallback<&'static str>) {
    const ROOT: [&str; 5] = ["a", "b", "c", "d", "e"];
    const CHILDREN: [&str; 3] = ["a0", "a1", "a2"];
    let source: &[&'static str] = match params.parent_item {
        None => &ROOT,
        Some("a") => &CHILDREN,
        Some(_) => &[],
    };
    let start = (params.page * params.page_size).min(source.len());
    let end = (start + params.page_size).min(source.len());
    callback.resolve(source[start..end].iter().copied(), None);
}

#[test]
fn flat_page_is_requested_and_delivered() {
    let (mut c, requests) = recording(ControllerOptions::new(5, 2));
    c.ensure_flat_index_loaded(3);

    let (params, callback) = take_request(&requests);
    assert_eq!(params.page, 1);
    assert_eq!(params.page_size, 2);
    assert_eq!(params.parent_item, None);
    assert!(c.is_loading());

    callback.resolve(["c", "d"], None);
    assert_eq!(c.process_responses(), 1);

    assert_eq!(c.root_cache().size(), 5);
    assert_eq!(c.effective_size(), 5);
    assert_eq!(c.flat_index_info(2).item, Some(&"c"));
    assert_eq!(c.flat_index_info(3).item, Some(&"d"));
    assert_eq!(c.flat_index_info(1).item, None);
    assert!(!c.is_loading());
}

#[test]
fn sub_level_takes_item_count_as_size() {
    let mut c: DataProviderController<&'static str> = DataProviderController::new(
        ControllerOptions::new(5, 10)
            .with_is_expanded(|item: &&str| *item == "a")
            .with_data_provider(letters),
    );
    c.ensure_flat_index_loaded(0);
    assert_eq!(c.effective_size(), 5);

    c.ensure_flat_index_children_loaded(0);
    let sub_cache = c.cache(&[0]).unwrap();
    assert_eq!(sub_cache.size(), 3);
    assert_eq!(sub_cache.effective_size(), 3);
    assert_eq!(c.effective_size(), 8);

    let info = c.flat_index_info(1);
    assert_eq!(info.item, Some(&"a0"));
    assert_eq!(info.level, 1);
    assert_eq!(info.path.as_slice(), &[0]);
    assert_eq!(c.flat_index_info(4).item, Some(&"b"));
    assert_eq!(c.flat_index_info(4).level, 0);
}

#[test]
fn root_size_reported_by_provider_wins_until_cleared() {
    let (mut c, requests) = recording(ControllerOptions::new(5, 2));
    c.ensure_first_page_loaded();
    let (params, callback) = take_request(&requests);
    assert_eq!(params.page, 0);
    callback.resolve(["a", "b"], Some(42));
    c.process_responses();

    assert_eq!(c.root_cache().size(), 42);
    assert_eq!(c.effective_size(), 42);
    assert_eq!(c.size(), 5);

    c.ensure_first_page_loaded();
    assert!(requests.lock().unwrap().is_empty());

    c.clear_cache();
    assert_eq!(c.effective_size(), 5);
    assert_eq!(c.flat_index_info(0).item, None);
}

#[test]
fn set_page_size_orphans_pending_requests() {
    let (mut c, requests) = recording(ControllerOptions::new(5, 2));
    c.ensure_flat_index_loaded(3);
    let (_, stale) = take_request(&requests);

    c.set_page_size(3);
    assert_eq!(c.page_size(), 3);
    assert!(!c.is_loading());

    stale.resolve(["c", "d"], Some(40));
    assert_eq!(c.process_responses(), 0);
    assert!(!c.is_loading());
    assert_eq!(c.root_cache().size(), 5);
    assert_eq!(c.root_cache().loaded_len(), 0);
    assert_eq!(c.applied_pages(), 0);
}

#[test]
fn set_data_provider_orphans_pending_requests() {
    let (mut c, requests) = recording(ControllerOptions::new(5, 2));
    c.ensure_flat_index_loaded(0);
    let (_, stale) = take_request(&requests);

    c.set_data_provider(letters);
    stale.resolve(["x", "y"], None);
    assert_eq!(c.process_responses(), 0);
    assert_eq!(c.flat_index_info(0).item, None);

    c.ensure_flat_index_loaded(0);
    assert_eq!(c.flat_index_info(0).item, Some(&"a"));
    assert_eq!(c.flat_index_info(1).item, Some(&"b"));
}

#[test]
fn requests_for_the_same_page_are_deduplicated() {
    let (mut c, requests) = recording(ControllerOptions::new(10, 5));
    c.ensure_flat_index_loaded(0);
    c.ensure_flat_index_loaded(3);
    c.ensure_flat_index_loaded(4);
    assert_eq!(requests.lock().unwrap().len(), 1);

    c.ensure_flat_index_loaded(5);
    assert_eq!(requests.lock().unwrap().len(), 2);
    assert_eq!(c.root_cache().pending_pages().collect::<Vec<_>>(), vec![0, 1]);

    let (_, first) = take_request(&requests);
    first.resolve(["a", "b", "c", "d", "e"], None);
    c.process_responses();
    assert!(c.is_loading());
    assert_eq!(c.root_cache().pending_pages().collect::<Vec<_>>(), vec![1]);
}

#[test]
fn out_of_order_responses_are_applied() {
    let (mut c, requests) = recording(ControllerOptions::new(6, 2));
    c.ensure_flat_index_loaded(0);
    c.ensure_flat_index_loaded(2);
    c.ensure_flat_index_loaded(4);
    let (_, p0) = take_request(&requests);
    let (_, p1) = take_request(&requests);
    let (_, p2) = take_request(&requests);

    p2.resolve(["e", "f"], None);
    p0.resolve(["a", "b"], None);
    assert_eq!(c.process_responses(), 2);
    assert!(c.is_loading());
    p1.resolve(["c", "d"], None);
    assert_eq!(c.process_responses(), 1);

    let items: Vec<_> = c.root_cache().items().map(|(_, item)| *item).collect();
    assert_eq!(items, vec!["a", "b", "c", "d", "e", "f"]);
    assert!(!c.is_loading());
}

#[test]
fn events_follow_requested_received_loaded() {
    let (mut c, requests) = recording(ControllerOptions::new(4, 2));
    let events = collect_events(&mut c);

    c.ensure_flat_index_loaded(2);
    assert_eq!(
        *events.lock().unwrap(),
        vec![DataEvent::PageRequested { level: 0, page: 1 }]
    );

    let (_, callback) = take_request(&requests);
    callback.resolve(["c", "d"], None);
    c.process_responses();
    assert_eq!(
        *events.lock().unwrap(),
        vec![
            DataEvent::PageRequested { level: 0, page: 1 },
            DataEvent::PageReceived { level: 0, page: 1 },
            DataEvent::PageLoaded { level: 0, page: 1 },
        ]
    );
}

#[test]
fn synchronous_provider_is_applied_before_ensure_returns() {
    let mut c: DataProviderController<&'static str> =
        DataProviderController::new(ControllerOptions::new(5, 2).with_data_provider(letters));
    let events = collect_events(&mut c);

    c.ensure_flat_index_loaded(4);
    assert_eq!(c.flat_index_info(4).item, Some(&"e"));
    assert!(!c.is_loading());
    let pages: Vec<_> = events.lock().unwrap().iter().map(DataEvent::page).collect();
    assert_eq!(pages, vec![2, 2, 2]);
}

#[test]
fn removed_listener_stops_receiving_events() {
    let (mut c, _requests) = recording(ControllerOptions::new(4, 2));
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let id = c.add_listener(move |event| sink.lock().unwrap().push(*event));

    assert!(c.remove_listener(id));
    assert!(!c.remove_listener(id));
    c.ensure_flat_index_loaded(0);
    assert!(events.lock().unwrap().is_empty());
}

#[test]
fn fetch_params_carry_parent_item_and_extra_params() {
    let requests: Arc<Mutex<Vec<FetchParams<&'static str, u32>>>> =
        Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&requests);
    let mut c: DataProviderController<&'static str, u32> = DataProviderController::new(
        ControllerOptions::new(2, 2)
            .with_is_expanded(|item: &&str| *item == "a")
            .with_data_provider_params(|| 7)
            .with_data_provider(move |params: FetchParams<&'static str, u32>, callback| {
                let items: Vec<&'static str> = match params.parent_item {
                    None => vec!["a", "b"],
                    Some(_) => vec!["a0"],
                };
                sink.lock().unwrap().push(params);
                callback.resolve(items, None);
            }),
    );

    c.ensure_flat_index_loaded(0);
    c.ensure_flat_index_children_loaded(0);

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].parent_item, None);
    assert_eq!(requests[0].extra, 7);
    assert_eq!(requests[1].parent_item, Some("a"));
    assert_eq!(requests[1].page, 0);
    assert_eq!(c.effective_size(), 3);
}

#[test]
fn children_are_requested_once() {
    let (mut c, requests) = recording(
        ControllerOptions::new(2, 2).with_is_expanded(|item: &&str| *item == "a"),
    );
    c.ensure_flat_index_loaded(0);
    let (_, root_page) = take_request(&requests);
    root_page.resolve(["a", "b"], None);
    c.process_responses();

    c.ensure_flat_index_children_loaded(1);
    assert!(requests.lock().unwrap().is_empty());

    c.ensure_flat_index_children_loaded(0);
    c.ensure_flat_index_children_loaded(0);
    assert_eq!(requests.lock().unwrap().len(), 1);

    let (params, children) = take_request(&requests);
    assert_eq!(params.parent_item, Some("a"));
    children.resolve(["a0", "a1"], None);
    c.process_responses();

    c.ensure_flat_index_children_loaded(0);
    assert!(requests.lock().unwrap().is_empty());
    assert_eq!(c.effective_size(), 4);
}

#[test]
fn removing_a_sub_cache_orphans_its_requests() {
    let (mut c, requests) = recording(
        ControllerOptions::new(2, 2).with_is_expanded(|item: &&str| *item == "a"),
    );
    c.ensure_flat_index_loaded(0);
    let (_, root_page) = take_request(&requests);
    root_page.resolve(["a", "b"], None);
    c.process_responses();

    c.ensure_flat_index_children_loaded(0);
    let (_, stale) = take_request(&requests);
    assert!(c.is_loading());

    assert!(c.remove_sub_cache(&[0]).is_some());
    assert!(c.remove_sub_cache(&[0]).is_none());
    assert!(!c.is_loading());

    stale.resolve(["a0"], None);
    assert_eq!(c.process_responses(), 0);
    assert_eq!(c.effective_size(), 2);

    c.ensure_flat_index_children_loaded(0);
    let (_, fresh) = take_request(&requests);
    fresh.resolve(["a0"], None);
    assert_eq!(c.process_responses(), 1);
    assert_eq!(c.effective_size(), 3);
}

#[test]
fn without_provider_loads_are_noops() {
    let mut c: DataProviderController<&'static str> =
        DataProviderController::new(ControllerOptions::new(3, 2));
    c.ensure_flat_index_loaded(0);
    c.ensure_first_page_loaded();
    assert!(!c.is_loading());

    let (mut c, requests) = recording(ControllerOptions::new(3, 2));
    c.remove_data_provider();
    c.ensure_flat_index_loaded(0);
    assert!(requests.lock().unwrap().is_empty());
}

#[test]
fn zero_page_size_is_rejected_or_coerced() {
    let strict: Result<DataProviderController<&'static str>, Error> =
        DataProviderController::try_new(ControllerOptions::new(3, 0));
    assert_eq!(strict.err(), Some(Error::ZeroPageSize));

    let mut c: DataProviderController<&'static str> =
        DataProviderController::new(ControllerOptions::new(3, 0));
    assert_eq!(c.page_size(), 1);
    assert_eq!(c.try_set_page_size(0), Err(Error::ZeroPageSize));
    c.set_page_size(0);
    assert_eq!(c.page_size(), 1);
    assert_eq!(c.root_cache().page_size(), 1);
}

#[test]
fn resolving_after_controller_drop_reports_disconnected() {
    let (mut c, requests) = recording(ControllerOptions::new(3, 2));
    c.ensure_flat_index_loaded(0);
    let (_, callback) = take_request(&requests);
    let request = callback.request_id();
    drop(c);

    assert_eq!(
        callback.try_resolve(["a"], None),
        Err(Error::Disconnected { request })
    );
}

#[test]
fn set_page_is_idempotent() {
    let mut once: Cache<&str> = Cache::new(2, 6);
    once.set_page(1, ["x", "y"]);
    let mut twice = once.clone();
    twice.set_page(1, ["x", "y"]);

    let a: Vec<_> = once.items().collect();
    let b: Vec<_> = twice.items().collect();
    assert_eq!(a, b);
    assert_eq!(a, vec![(2, &"x"), (3, &"y")]);
    assert!(once.is_page_loaded(1));
    assert!(!once.is_page_loaded(0));
    assert_eq!(once.size(), 6);
}

#[test]
fn effective_size_counts_only_expanded_subtrees() {
    let mut root: Cache<u32> = Cache::new(10, 6);
    root.set_page(0, [0, 1, 2, 3]);
    root.create_sub_cache(1).set_size(3);
    root.create_sub_cache(2).set_size(5);
    root.create_sub_cache(5).set_size(2);

    let expanded = |item: &u32| *item == 1;
    root.recalculate_effective_size(None, &expanded);

    // item 5 is not loaded, so its subtree counts
    assert_eq!(root.effective_size(), 6 + 3 + 2);
    assert_eq!(root.get_sub_cache(1).unwrap().effective_size(), 3);
    assert_eq!(root.get_sub_cache(2).unwrap().effective_size(), 0);

    let nothing = |_: &u32| false;
    root.recalculate_effective_size(None, &nothing);
    assert_eq!(root.effective_size(), 6 + 2);

    let sub_cache = root.get_sub_cache_mut(1).unwrap();
    sub_cache.set_page(0, [10, 11, 12]);
    sub_cache.create_sub_cache(0).set_size(4);
    let deep = |item: &u32| *item == 1 || *item == 10;
    root.recalculate_effective_size(None, &deep);
    assert_eq!(root.effective_size(), 6 + (3 + 4) + 2);
}

#[test]
fn sub_cache_lifecycle() {
    let mut root: Cache<u32> = Cache::new(4, 3);
    assert!(root.is_root());
    let sub_cache = root.create_sub_cache(2);
    assert_eq!(sub_cache.parent_index(), Some(2));
    assert_eq!(sub_cache.page_size(), 4);
    assert_eq!(sub_cache.size(), 0);
    sub_cache.set_size(9);

    // creating again starts over
    assert_eq!(root.create_sub_cache(2).size(), 0);
    root.create_sub_cache(0);
    let order: Vec<_> = root.sub_caches().map(|(index, _)| index).collect();
    assert_eq!(order, vec![0, 2]);

    assert!(root.remove_sub_cache(2).is_some());
    assert!(root.get_sub_cache(2).is_none());
    assert_eq!(root.sub_cache_count(), 1);
}

#[test]
fn get_flat_index_clamps_and_skips_preceding_subtrees() {
    let mut root: Cache<u32> = Cache::new(10, 4);
    root.set_page(0, [0, 1, 2, 3]);
    root.create_sub_cache(1).set_size(3);
    root.recalculate_effective_size(None, &|item: &u32| *item == 1);

    assert_eq!(root.get_flat_index(0), 0);
    assert_eq!(root.get_flat_index(1), 1);
    assert_eq!(root.get_flat_index(2), 5);
    assert_eq!(root.get_flat_index(100), 6);

    let empty: Cache<u32> = Cache::new(10, 0);
    assert_eq!(empty.get_flat_index(5), 0);
}

#[test]
fn flat_index_by_path_walks_expanded_levels() {
    let mut root: Cache<u32> = Cache::new(10, 4);
    root.set_page(0, [0, 1, 2, 3]);
    root.create_sub_cache(1).set_size(3);
    root.create_sub_cache(2).set_size(2);
    root.recalculate_effective_size(None, &|item: &u32| *item == 1);

    assert_eq!(flat_index_by_path(&root, &[]), 0);
    assert_eq!(flat_index_by_path(&root, &[0]), 0);
    assert_eq!(flat_index_by_path(&root, &[LAST]), 6);
    assert_eq!(flat_index_by_path(&root, &[1, 0]), 2);
    assert_eq!(flat_index_by_path(&root, &[1, LAST]), 4);
    assert_eq!(flat_index_by_path(&root, &[2]), 5);
    // collapsed subtree: the rest of the path is ignored
    assert_eq!(flat_index_by_path(&root, &[2, 1]), 5);
    // no sub-cache for item 3
    assert_eq!(flat_index_by_path(&root, &[3, 7, 1]), 6);
}

#[test]
fn flat_index_info_past_the_end_has_no_item() {
    let mut root: Cache<u32> = Cache::new(10, 2);
    root.set_page(0, [0, 1]);
    let info = flat_index_info(&root, 5);
    assert_eq!(info.item, None);
    assert_eq!(info.index, 5);
    assert_eq!(info.level, 0);
    assert!(info.path.is_root());
}

#[test]
fn cache_path_navigation() {
    let path = CachePath::root().child(3).child(1);
    assert_eq!(path.level(), 2);
    assert_eq!(path.parent_index(), Some(1));
    assert_eq!(path.parent(), Some(CachePath::from(&[3][..])));
    assert_eq!(CachePath::root().parent(), None);
    assert_eq!(&*path, &[3, 1]);
}

const ROOT_SIZE: usize = 20;
const MAX_DEPTH: usize = 3;

fn child_count(parent: Option<&str>) -> usize {
    match parent {
        None => ROOT_SIZE,
        Some(name) if name.split('/').count() >= MAX_DEPTH => 0,
        Some(name) => (name.bytes().map(usize::from).sum::<usize>() * 7) % 5,
    }
}

fn child_name(parent: Option<&str>, index: usize) -> String {
    match parent {
        None => index.to_string(),
        Some(name) => format!("{name}/{index}"),
    }
}

fn tree_provider(params: FetchParams<String>, callback: PageCallback<String>) {
    let parent = params.parent_item.as_deref();
    let count = child_count(parent);
    let start = params.page * params.page_size;
    let end = (start + params.page_size).min(count);
    callback.resolve((start..end).map(|i| child_name(parent, i)), Some(count));
}

fn expected_rows(parent: Option<&str>, expanded: &HashSet<String>) -> usize {
    (0..child_count(parent))
        .map(|i| {
            let child = child_name(parent, i);
            1 + if expanded.contains(&child) {
                expected_rows(Some(&child), expanded)
            } else {
                0
            }
        })
        .sum()
}

fn random_expansion(rng: &mut Lcg, parent: Option<&str>, out: &mut HashSet<String>) {
    for i in 0..child_count(parent) {
        if rng.gen_bool() {
            let child = child_name(parent, i);
            random_expansion(rng, Some(&child), out);
            out.insert(child);
        }
    }
}

fn loaded_items<T>(cache: &Cache<T>) -> usize {
    cache.loaded_len()
        + cache
            .sub_caches()
            .map(|(_, sub_cache)| loaded_items(sub_cache))
            .sum::<usize>()
}

fn load_everything_visible(c: &mut DataProviderController<String>) {
    loop {
        let before = (c.effective_size(), loaded_items(c.root_cache()));
        for flat_index in 0..c.effective_size() {
            c.ensure_flat_index_loaded(flat_index);
            c.ensure_flat_index_children_loaded(flat_index);
        }
        if before == (c.effective_size(), loaded_items(c.root_cache())) {
            break;
        }
    }
}

fn assert_round_trip(c: &DataProviderController<String>) {
    for flat_index in 0..c.effective_size() {
        let info = c.flat_index_info(flat_index);
        let item = info.item.expect("every visible row is loaded");
        let path = info.item_path();
        let name: Vec<String> = path.iter().map(usize::to_string).collect();
        assert_eq!(item, &name.join("/"));
        assert_eq!(info.level, path.level() - 1);
        assert_eq!(c.flat_index_by_path(&path), flat_index);
    }
}

#[test]
fn randomized_expansion_keeps_sizes_and_mapping_consistent() {
    let mut rng = Lcg::new(0x5eed);
    for _ in 0..8 {
        let mut expanded = HashSet::new();
        random_expansion(&mut rng, None, &mut expanded);
        let shared = Arc::new(expanded.clone());

        let mut c: DataProviderController<String> = DataProviderController::new(
            ControllerOptions::new(ROOT_SIZE, 3)
                .with_is_expanded(move |item: &String| shared.contains(item))
                .with_data_provider(tree_provider),
        );
        load_everything_visible(&mut c);

        assert_eq!(c.effective_size(), expected_rows(None, &expanded));
        assert!(!c.is_loading());
        assert_round_trip(&c);

        // collapse a random half; cached subtrees stay but stop counting
        let collapsed: HashSet<String> = expanded
            .iter()
            .filter(|_| rng.gen_bool())
            .cloned()
            .collect();
        let remaining: HashSet<String> = expanded.difference(&collapsed).cloned().collect();
        let shared = Arc::new(remaining.clone());
        c.set_is_expanded(move |item: &String| shared.contains(item));

        assert_eq!(c.effective_size(), expected_rows(None, &remaining));
        assert_round_trip(&c);
    }
}
