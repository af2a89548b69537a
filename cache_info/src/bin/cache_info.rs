use cache_info::{get_cache_info, CacheHierarchy};

pub fn main() {
    let caches = get_cache_info();
    if caches.is_empty() {
        eprintln!("No cache parameters available on this CPU");
        return;
    }
    for cache in &caches {
        println!(
            "L{} {:?}: {} bytes ({} ways, {} sets, {} B lines)",
            cache.level,
            cache.cache_type,
            cache.size(),
            cache.ways,
            cache.sets,
            cache.line_size
        );
    }
    println!("{:#?}", CacheHierarchy::from_caches(&caches));
}
