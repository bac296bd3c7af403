//! End-to-end scenario: a caller marks the arena, allocates scratch memory
//! across a growth boundary, rewinds to the marker, and confirms the
//! reclaimed chunk is handed back out on the next pass.

use rt_arena::{Arena, Config};

#[test]
fn marker_rollback_reuses_addresses() {
    let mut arena = Arena::new(Config::new(64)).unwrap();

    let marker = arena.mark();
    assert_eq!(arena.chunk_count(), 1);

    // Force growth past the first chunk.
    let a = arena.allocate(48, None).unwrap();
    let b = arena.allocate(48, None).unwrap();
    assert_eq!(arena.chunk_count(), 2);
    let a_addr = a.as_ptr() as usize;
    let b_addr = b.as_ptr() as usize;

    arena.reset_to(marker);
    assert_eq!(arena.chunk_count(), 1);
    assert_eq!(arena.allocated_bytes(), 0);

    let a2 = arena.allocate(48, None).unwrap();
    let b2 = arena.allocate(48, None).unwrap();
    assert_eq!(arena.chunk_count(), 2);
    assert_eq!(a2.as_ptr() as usize, a_addr);
    assert_eq!(b2.as_ptr() as usize, b_addr);
}

#[test]
fn nested_markers_roll_back_independently() {
    let mut arena = Arena::new(Config::new(1024)).unwrap();

    let outer = arena.mark();
    arena.allocate(32, None).unwrap();
    let inner = arena.mark();
    arena.allocate(32, None).unwrap();
    let inner_bytes = arena.allocated_bytes();

    arena.reset_to(inner);
    assert!(arena.allocated_bytes() < inner_bytes);

    arena.reset_to(outer);
    assert_eq!(arena.allocated_bytes(), 0);
}

#[test]
fn virtual_memory_backed_arena_allocates() {
    let config = Config::new(8192).with_virtual_memory(true).with_name("vm-scratch");
    let mut arena = Arena::new(config).unwrap();
    let region = arena.allocate(128, None).unwrap();
    assert_eq!(region.len(), 128);
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let config = Config::new(8).with_alignment(16);
    let err = Arena::new(config).unwrap_err();
    assert!(matches!(err, rt_arena::ConfigError::InvalidChunkSize { .. }));
}
