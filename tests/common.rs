//! Integration tests for alisp-common crate.

use alisp_common::{BytePos, Handle, LineIndex, Location, Registry, RegistryError, Span, INLINE_SLOTS};

// ============================================================================
// Span
// ============================================================================

#[test]
fn test_span_merge() {
    let a = Span::from_usize(10, 20);
    let b = Span::from_usize(15, 30);
    let merged = a.merge(b);
    assert_eq!(merged.start.0, 10);
    assert_eq!(merged.end.0, 30);
}

#[test]
fn test_span_len_and_range() {
    let span = Span::from_usize(5, 15);
    assert_eq!(span.len(), 10);
    assert_eq!(span.range(), 5..15);
    assert!(Span::from_usize(5, 5).is_empty());
}

#[test]
fn test_byte_pos_offset() {
    assert_eq!(BytePos(3).offset(4), BytePos(7));
}

// ============================================================================
// 行列索引
// ============================================================================

#[test]
fn test_line_index_locations() {
    let index = LineIndex::new("ab\ncd\n");
    assert_eq!(index.line_count(), 3);
    assert_eq!(index.location(BytePos(0)), Location { line: 1, column: 1 });
    assert_eq!(index.location(BytePos(4)), Location { line: 2, column: 2 });
    assert_eq!(index.location(BytePos(6)), Location { line: 3, column: 1 });
}

#[test]
fn test_line_index_past_end_is_clamped() {
    let index = LineIndex::new("abc");
    assert_eq!(index.location(BytePos(100)), Location { line: 1, column: 4 });
}

#[test]
fn test_line_index_counts_characters() {
    let index = LineIndex::new("é x");
    assert_eq!(index.location(BytePos(3)).column, 3);
}

#[test]
fn test_line_text() {
    let index = LineIndex::new("first\r\nsecond\n");
    assert_eq!(index.line_text(1), Some("first"));
    assert_eq!(index.line_text(2), Some("second"));
    assert_eq!(index.line_text(3), Some(""));
    assert_eq!(index.line_text(0), None);
    assert_eq!(index.line_text(4), None);
}

#[test]
fn test_location_display() {
    assert_eq!(Location { line: 2, column: 5 }.to_string(), "2:5");
}

// ============================================================================
// 资源注册表
// ============================================================================

#[test]
fn test_registry_put_get() {
    let mut registry: Registry<String, 7> = Registry::new();
    let handle = registry.put("stream".to_string()).unwrap();
    assert_eq!(handle.tag(), 7);
    assert!(handle.is_inline());
    assert!(handle.is_valid());
    assert_eq!(handle.index(), 0);
    assert_eq!(registry.get(handle).map(String::as_str), Some("stream"));
    assert!(registry.belongs(handle));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_registry_get_mut() {
    let mut registry: Registry<Vec<u8>, 1> = Registry::new();
    let handle = registry.put(Vec::new()).unwrap();
    registry.get_mut(handle).unwrap().push(9);
    assert_eq!(registry.get(handle), Some(&vec![9]));
}

#[test]
fn test_registry_destroy_makes_handle_stale() {
    let mut registry: Registry<&str, 2> = Registry::new();
    let old = registry.put("a").unwrap();
    assert_eq!(registry.destroy(old), Some("a"));
    assert!(!registry.belongs(old));
    assert!(registry.is_empty());

    // The slot is reused under a new generation.
    let new = registry.put("b").unwrap();
    assert_eq!(new.index(), old.index());
    assert_ne!(new.generation(), old.generation());
    assert_eq!(registry.get(old), None);
    assert_eq!(registry.get(new), Some(&"b"));
    assert_eq!(registry.destroy(old), None);
}

#[test]
fn test_registry_spills_into_dynamic_storage() {
    let mut registry: Registry<usize, 4> = Registry::new();
    let handles: Vec<Handle> = (0..INLINE_SLOTS + 2).map(|i| registry.put(i).unwrap()).collect();
    assert!(handles[..INLINE_SLOTS].iter().all(|h| h.is_inline()));
    let spilled = handles[INLINE_SLOTS];
    assert!(!spilled.is_inline());
    assert_eq!(spilled.index(), 0);
    assert_eq!(registry.get(spilled), Some(&INLINE_SLOTS));
    assert_eq!(registry.len(), INLINE_SLOTS + 2);
}

#[test]
fn test_registry_rejects_foreign_handles() {
    let mut files: Registry<u8, 1> = Registry::new();
    let sockets: Registry<u8, 2> = Registry::new();
    let handle = files.put(1).unwrap();
    assert!(!sockets.belongs(handle));
    assert!(!files.belongs(Handle::from_raw(0)));
}

#[test]
fn test_handle_raw_round_trip() {
    let mut registry: Registry<(), 9> = Registry::new();
    let handle = registry.put(()).unwrap();
    assert_eq!(Handle::from_raw(handle.raw()), handle);
    assert!(registry.belongs(Handle::from_raw(handle.raw())));
}

#[test]
fn test_registry_error_display() {
    let err = RegistryError::Exhausted { tag: 3 };
    assert_eq!(err.to_string(), "registry 3 is full");
}
