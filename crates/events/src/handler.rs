/// Execute an aggregate command deterministically (no IO, no async).
///
/// Decide (`handle`) then evolve (`apply`) in one step, mutating the
/// aggregate in place. Useful for unit tests and inline processing; the
/// persisted pipeline lives in the infra dispatcher.
pub fn execute<A>(
    aggregate: &mut A,
    command: &A::Command,
) -> Result<Vec<A::Event>, A::Error>
where
    A: comptoir_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
