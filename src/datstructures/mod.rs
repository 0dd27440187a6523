pub mod scope_stack;
