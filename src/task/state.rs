use super::types::State;

/// Returns whether a task may move from `src` to `dst`.
///
/// The lifecycle is forward-only: `Failed` is reachable from any non-terminal
/// state, and terminal states (`Completed`, `Failed`) have no outgoing edges.
/// A state may always transition to itself, so duplicate intent delivery is
/// safe under at-least-once submission semantics.
pub fn valid_state_transition(src: State, dst: State) -> bool {
    if src == dst {
        return true;
    }

    matches!(
        (src, dst),
        (State::Pending, State::Scheduled)
            | (State::Pending, State::Failed)
            | (State::Scheduled, State::Running)
            | (State::Scheduled, State::Failed)
            | (State::Running, State::Completed)
            | (State::Running, State::Failed)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use State::*;

    const ALL: [State; 5] = [Pending, Scheduled, Running, Completed, Failed];

    #[test]
    fn self_transition_is_always_valid() {
        for s in ALL {
            assert!(valid_state_transition(s, s), "{s} -> {s} should be valid");
        }
    }

    #[test]
    fn forward_edges_are_valid() {
        assert!(valid_state_transition(Pending, Scheduled));
        assert!(valid_state_transition(Scheduled, Running));
        assert!(valid_state_transition(Running, Completed));
    }

    #[test]
    fn failed_is_reachable_from_any_non_terminal_state() {
        assert!(valid_state_transition(Pending, Failed));
        assert!(valid_state_transition(Scheduled, Failed));
        assert!(valid_state_transition(Running, Failed));
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        for dst in ALL {
            if dst != Completed {
                assert!(!valid_state_transition(Completed, dst), "Completed -> {dst}");
            }
            if dst != Failed {
                assert!(!valid_state_transition(Failed, dst), "Failed -> {dst}");
            }
        }
    }

    #[test]
    fn everything_not_in_the_table_is_rejected() {
        let allowed = [
            (Pending, Scheduled),
            (Pending, Failed),
            (Scheduled, Running),
            (Scheduled, Failed),
            (Running, Completed),
            (Running, Failed),
        ];

        for src in ALL {
            for dst in ALL {
                let expected = src == dst || allowed.contains(&(src, dst));
                assert_eq!(
                    valid_state_transition(src, dst),
                    expected,
                    "{src} -> {dst}"
                );
            }
        }
    }

    #[test]
    fn no_backward_movement() {
        assert!(!valid_state_transition(Running, Scheduled));
        assert!(!valid_state_transition(Running, Pending));
        assert!(!valid_state_transition(Scheduled, Pending));
        assert!(!valid_state_transition(Completed, Running));
    }
}
