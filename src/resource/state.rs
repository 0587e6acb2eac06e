//! Resource states and the legal edges between them.

use std::fmt;

use crate::error::StateTransitionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceState {
    #[default]
    Init,
    Loading,
    Loaded,
    Attached,
    /// Audio only: device sample released, decoded data dropped.
    Detached,
    /// Terminal.
    Error,
}

impl ResourceState {
    /// Whether `self -> to` is a declared edge.
    pub const fn can_transition(self, to: ResourceState) -> bool {
        use ResourceState::*;

        matches!(
            (self, to),
            (Init, Loading)
                | (Loading, Loaded | Error | Init)
                | (Loaded, Attached | Error | Init)
                | (Attached, Init | Detached)
                | (Detached, Loading)
        )
    }

    /// Validate an edge for the resource `id`.
    pub fn check(self, id: &str, to: ResourceState) -> Result<(), StateTransitionError> {
        if self.can_transition(to) {
            Ok(())
        } else {
            Err(StateTransitionError {
                id: id.to_string(),
                from: self,
                to,
            })
        }
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Init => "init",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Attached => "attached",
            Self::Detached => "detached",
            Self::Error => "error",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ResourceState::*;

    const ALL: [ResourceState; 6] = [Init, Loading, Loaded, Attached, Detached, Error];

    #[test]
    fn test_only_declared_edges_succeed() {
        let declared = [
            (Init, Loading),
            (Loading, Loaded),
            (Loading, Error),
            (Loading, Init),
            (Loaded, Attached),
            (Loaded, Error),
            (Loaded, Init),
            (Attached, Init),
            (Attached, Detached),
            (Detached, Loading),
        ];

        for from in ALL {
            for to in ALL {
                let expected = declared.contains(&(from, to));
                assert_eq!(from.check("r", to).is_ok(), expected, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_error_is_terminal() {
        assert!(ALL.iter().all(|to| !Error.can_transition(*to)));
    }

    #[test]
    fn test_error_reports_edge() {
        let err = Init.check("logo.png", Attached).unwrap_err();
        assert_eq!(err.to_string(), "invalid state transition for `logo.png`: init -> attached");
    }
}
