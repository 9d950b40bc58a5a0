//! End-to-end rewrite scenarios over in-memory and on-disk programs.

mod commit;
mod rewrite_scenarios;
