//! Per-thread stack of the types currently being constructed.
//!
//! Construction is synchronous, so a constructor chain never leaves the thread
//! it started on; re-entering a type already on the stack is a cycle.

use crate::error::{MantleError, Result};
use std::any::TypeId;
use std::cell::RefCell;

thread_local! {
    static RESOLVING: RefCell<Vec<(TypeId, &'static str)>> = const { RefCell::new(Vec::new()) };
}

struct StackGuard;

impl Drop for StackGuard {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Runs `build` with `type_id` pushed on the resolution stack.
pub(crate) fn enter<R>(
    type_id: TypeId,
    type_name: &'static str,
    build: impl FnOnce() -> Result<R>,
) -> Result<R> {
    RESOLVING.with(|stack| {
        let mut stack = stack.borrow_mut();
        if let Some(start) = stack.iter().position(|(id, _)| *id == type_id) {
            let mut cycle: Vec<&str> = stack[start..].iter().map(|(_, name)| *name).collect();
            cycle.push(type_name);
            return Err(MantleError::CircularDependency {
                cycle: cycle.join(" -> "),
            });
        }
        stack.push((type_id, type_name));
        Ok(())
    })?;

    let _guard = StackGuard;
    build()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;

    #[test]
    fn test_nested_distinct_types_are_allowed() {
        let result = enter(TypeId::of::<A>(), "A", || {
            enter(TypeId::of::<B>(), "B", || Ok(42))
        });
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_reentry_reports_the_cycle() {
        let result: Result<()> = enter(TypeId::of::<A>(), "A", || {
            enter(TypeId::of::<B>(), "B", || enter(TypeId::of::<A>(), "A", || Ok(())))
        });
        match result {
            Err(MantleError::CircularDependency { cycle }) => assert_eq!(cycle, "A -> B -> A"),
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_stack_unwinds_after_errors() {
        let _ = enter(TypeId::of::<A>(), "A", || -> Result<()> {
            Err(MantleError::Internal("fail".into()))
        });
        assert!(enter(TypeId::of::<A>(), "A", || Ok(())).is_ok());
    }
}
