use fibre_block_cache::CacheBuilder;

fn main() {
  // A cache holding up to 64 KiB of blocks, spread over 4 shards.
  let cache = CacheBuilder::default()
    .capacity(64 * 1024)
    .shards(4)
    .build()
    .expect("Failed to build cache");

  // Give this client its own key prefix.
  let table_id = cache.new_id();
  let key = |offset: u64| format!("{table_id}/{offset}").into_bytes();

  println!("Inserting block 0 of table {table_id} with a charge of 128 bytes.");
  let handle = cache.insert_with_deleter(&key(0), vec![0u8; 128], 128, |key: &[u8], block: Vec<u8>| {
    println!(
      "Deleter: dropping {} bytes for key {}",
      block.len(),
      String::from_utf8_lossy(key)
    );
  });
  println!("Inserted value is {} bytes long.", handle.len());
  handle.release();

  match cache.lookup(&key(0)) {
    Some(hit) => println!("Found block 0: {} bytes", cache.value(&hit).len()),
    None => println!("Block 0 not found."),
  }

  // A handle keeps its value readable after the entry is erased.
  let pinned = cache.lookup(&key(0)).expect("block 0 is cached");
  cache.erase(&key(0));
  println!("Erased block 0; the pinned handle still sees {} bytes.", pinned.len());
  println!("Releasing the last handle runs the deleter:");
  pinned.release();

  println!("\nCache metrics: {:#?}", cache.metrics());
}
