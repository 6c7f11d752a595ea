//! Bounded bump allocator for source buffers and interned strings
//!
//! `seq-core`'s module docs reserve an `arena` module for "thread-local
//! bump allocation for fast value creation" but never implement it in
//! the retrieved slice; `uyac` is the first real consumer of the
//! `bumpalo` dependency the workspace already carries.
//!
//! The AST and IR in this crate use ordinary Rust ownership (`Box`,
//! `Vec`) for parent-child edges rather than arena indices — see
//! `DESIGN.md` for the rationale. The arena here backs the two things
//! that actually want bump-allocated, bulk-freed storage for the
//! lifetime of one compilation: each source file's text, and the
//! identifier/string intern table built while lexing it.

use std::cell::Cell;

/// A bounded bump allocator. Exhaustion is reported as an error naming
/// the requested size and the remaining capacity (spec 4.1), rather than
/// aborting the process, so the driver can turn it into a diagnostic.
pub struct Arena {
    bump: bumpalo::Bump,
    limit: usize,
    reset_count: Cell<usize>,
}

/// Default bound for one compilation's arena (spec 9, Open Question:
/// the mini-compiler hard-codes 16 MiB; `uyac` keeps the same default
/// but makes it configurable via `CompilerConfig`).
pub const DEFAULT_ARENA_BYTES: usize = 16 * 1024 * 1024;

/// Default bound for a single source file's buffer (spec 9, Open
/// Question: the mini-compiler hard-codes 1 MiB per file).
pub const DEFAULT_SOURCE_BUFFER_BYTES: usize = 1024 * 1024;

impl Arena {
    pub fn with_capacity(limit: usize) -> Self {
        Arena {
            bump: bumpalo::Bump::new(),
            limit,
            reset_count: Cell::new(0),
        }
    }

    /// Bytes currently allocated out of this arena.
    pub fn used_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }

    pub fn remaining_bytes(&self) -> usize {
        self.limit.saturating_sub(self.used_bytes())
    }

    /// Copy `s` into the arena, returning a reference stable for the
    /// arena's lifetime. Fails if `s` would exceed the arena's bound.
    pub fn alloc_str(&self, s: &str) -> Result<&str, String> {
        if self.used_bytes() + s.len() > self.limit {
            return Err(format!(
                "arena exhausted: requested {} bytes, {} remaining of {} total",
                s.len(),
                self.remaining_bytes(),
                self.limit
            ));
        }
        Ok(self.bump.alloc_str(s))
    }

    /// Read `path`'s bytes as UTF-8 and copy them into the arena,
    /// bounded by `max_file_bytes` (spec 4.1 / the 1 MiB-per-file
    /// default in spec 9).
    pub fn alloc_source_file(&self, path: &std::path::Path, max_file_bytes: usize) -> Result<&str, String> {
        let bytes = std::fs::read(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        if bytes.len() > max_file_bytes {
            return Err(format!(
                "{}: source file is {} bytes, exceeding the {}-byte per-file limit",
                path.display(),
                bytes.len(),
                max_file_bytes
            ));
        }
        let text = String::from_utf8(bytes).map_err(|e| format!("{}: not valid UTF-8: {e}", path.display()))?;
        self.alloc_str(&text)
    }

    /// Reset the arena to empty without zeroing (spec 4.1). All
    /// previously returned references become dangling; callers must not
    /// retain them past a reset (spec 5's arena lifetime contract).
    ///
    /// # Safety
    /// This is only memory-safe if nothing still holds a `&str` handed
    /// out before the reset. `uyac` only calls this between whole
    /// compilations, never mid-pipeline.
    pub unsafe fn reset(&mut self) {
        self.bump.reset();
        self.reset_count.set(self.reset_count.get() + 1);
    }
}

impl Default for Arena {
    fn default() -> Self {
        Arena::with_capacity(DEFAULT_ARENA_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_within_limit_succeeds() {
        let arena = Arena::with_capacity(64);
        let s = arena.alloc_str("hello").unwrap();
        assert_eq!(s, "hello");
        assert_eq!(arena.used_bytes(), 5);
    }

    #[test]
    fn alloc_beyond_limit_is_an_error_naming_sizes() {
        let arena = Arena::with_capacity(4);
        let err = arena.alloc_str("hello").unwrap_err();
        assert!(err.contains("requested 5 bytes"));
        assert!(err.contains("4 remaining"));
    }

    #[test]
    fn reset_reclaims_capacity() {
        let mut arena = Arena::with_capacity(16);
        arena.alloc_str("0123456789").unwrap();
        assert!(arena.alloc_str("0123456789").is_err());
        unsafe { arena.reset() };
        assert_eq!(arena.used_bytes(), 0);
        assert!(arena.alloc_str("0123456789").is_ok());
    }
}
