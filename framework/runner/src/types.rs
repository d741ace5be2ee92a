/// Recommended error type for code that drives the runner, such as a custom `main` function. It
/// is compatible with the errors returned by [crate::run::run] so you can use `?` to propagate
/// them.
pub type StairSpeedResult<T> = anyhow::Result<T>;
