mod index_reconciler;

pub use index_reconciler::IndexReconciler;
