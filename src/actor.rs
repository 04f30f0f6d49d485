//! The `ActorService` capability: identifies who is running the audit, so
//! waivers created during a run are attributed.

/// The identity attributed to records created during an audit run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Actor {
    pub id: String,
    pub display_name: Option<String>,
}

pub trait ActorService {
    fn current_actor(&self) -> Actor;
}

/// Resolves the actor from the environment: `GITGOV_ACTOR`, falling back to
/// `USER`, falling back to `"unknown"`.
pub struct EnvActorService;

impl ActorService for EnvActorService {
    fn current_actor(&self) -> Actor {
        let id = std::env::var("GITGOV_ACTOR")
            .or_else(|_| std::env::var("USER"))
            .unwrap_or_else(|_| "unknown".to_string());
        Actor {
            id,
            display_name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedActorService(Actor);

    impl ActorService for FixedActorService {
        fn current_actor(&self) -> Actor {
            self.0.clone()
        }
    }

    #[test]
    fn fixed_actor_service_returns_configured_actor() {
        let service = FixedActorService(Actor {
            id: "ci-bot".into(),
            display_name: Some("CI Bot".into()),
        });
        assert_eq!(service.current_actor().id, "ci-bot");
    }
}
