//! Connection state machine.
//!
//! Every operation on the graph is decided here from the current edge between
//! two users (or its absence). The decision is a [`Transition`] the repository
//! applies inside the same transaction that read the edge.

use uuid::Uuid;

use crate::{
    api::error,
    modules::connection::schema::{ConnectionEntity, ConnectionStatus},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Request { target: Uuid },
    Accept,
    Reject,
    Cancel,
    Remove,
    Block { target: Uuid },
    Unblock,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Insert { requester_id: Uuid, addressee_id: Uuid, status: ConnectionStatus },
    Update { id: Uuid, requester_id: Uuid, addressee_id: Uuid, status: ConnectionStatus },
    Delete { id: Uuid },
    Keep(ConnectionEntity),
}

pub fn decide(
    action: Action,
    caller: Uuid,
    existing: Option<&ConnectionEntity>,
) -> Result<Transition, error::SystemError> {
    if let Some(edge) = existing {
        if !edge.involves(caller) {
            return match action {
                Action::Request { .. } | Action::Block { .. } => {
                    Err(error::SystemError::bad_request("Connection does not involve the caller"))
                }
                _ => Err(error::SystemError::forbidden(
                    "You are not a participant of this connection",
                )),
            };
        }
    }

    match action {
        Action::Request { target } => request(caller, target, existing),
        Action::Accept => respond(caller, existing, ConnectionStatus::Accepted),
        Action::Reject => respond(caller, existing, ConnectionStatus::Rejected),
        Action::Cancel => cancel(caller, existing),
        Action::Remove => remove(existing),
        Action::Block { target } => block(caller, target, existing),
        Action::Unblock => unblock(caller, existing),
    }
}

fn request(
    caller: Uuid,
    target: Uuid,
    existing: Option<&ConnectionEntity>,
) -> Result<Transition, error::SystemError> {
    if caller == target {
        return Err(error::SystemError::bad_request("Cannot send connection request to yourself"));
    }

    let Some(edge) = existing else {
        return Ok(Transition::Insert {
            requester_id: caller,
            addressee_id: target,
            status: ConnectionStatus::Pending,
        });
    };

    match edge.status {
        ConnectionStatus::Pending => {
            Err(error::SystemError::conflict("Connection request already pending"))
        }
        ConnectionStatus::Accepted => {
            Err(error::SystemError::conflict("Users are already connected"))
        }
        ConnectionStatus::Rejected => {
            Err(error::SystemError::conflict("Connection request was already answered"))
        }
        ConnectionStatus::Blocked => {
            Err(error::SystemError::forbidden("Cannot send request to blocked user"))
        }
    }
}

fn respond(
    caller: Uuid,
    existing: Option<&ConnectionEntity>,
    status: ConnectionStatus,
) -> Result<Transition, error::SystemError> {
    let edge = existing.ok_or_else(|| error::SystemError::not_found("Connection request not found"))?;

    if edge.addressee_id != caller {
        return Err(error::SystemError::forbidden(
            "Only the recipient can respond to this connection request",
        ));
    }

    if edge.status != ConnectionStatus::Pending {
        return Err(error::SystemError::conflict("Connection request is no longer pending"));
    }

    Ok(Transition::Update {
        id: edge.id,
        requester_id: edge.requester_id,
        addressee_id: edge.addressee_id,
        status,
    })
}

fn cancel(caller: Uuid, existing: Option<&ConnectionEntity>) -> Result<Transition, error::SystemError> {
    let edge = existing.ok_or_else(|| error::SystemError::not_found("Connection request not found"))?;

    if edge.requester_id != caller {
        return Err(error::SystemError::forbidden(
            "Only the sender can cancel this connection request",
        ));
    }

    if edge.status != ConnectionStatus::Pending {
        return Err(error::SystemError::conflict("Connection request is no longer pending"));
    }

    Ok(Transition::Delete { id: edge.id })
}

fn remove(existing: Option<&ConnectionEntity>) -> Result<Transition, error::SystemError> {
    match existing {
        Some(edge) if edge.status == ConnectionStatus::Accepted => {
            Ok(Transition::Delete { id: edge.id })
        }
        _ => Err(error::SystemError::not_found("Connection not found")),
    }
}

fn block(
    caller: Uuid,
    target: Uuid,
    existing: Option<&ConnectionEntity>,
) -> Result<Transition, error::SystemError> {
    if caller == target {
        return Err(error::SystemError::bad_request("Cannot block yourself"));
    }

    let Some(edge) = existing else {
        return Ok(Transition::Insert {
            requester_id: caller,
            addressee_id: target,
            status: ConnectionStatus::Blocked,
        });
    };

    if edge.status == ConnectionStatus::Blocked {
        if edge.requester_id == caller {
            return Ok(Transition::Keep(edge.clone()));
        }
        return Err(error::SystemError::conflict("Connection is already blocked"));
    }

    Ok(Transition::Update {
        id: edge.id,
        requester_id: caller,
        addressee_id: target,
        status: ConnectionStatus::Blocked,
    })
}

fn unblock(caller: Uuid, existing: Option<&ConnectionEntity>) -> Result<Transition, error::SystemError> {
    let edge = match existing {
        Some(edge) if edge.status == ConnectionStatus::Blocked => edge,
        _ => return Err(error::SystemError::not_found("User is not blocked")),
    };

    if edge.requester_id != caller {
        return Err(error::SystemError::forbidden("Only the user who blocked can unblock"));
    }

    Ok(Transition::Delete { id: edge.id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn edge(requester: Uuid, addressee: Uuid, status: ConnectionStatus) -> ConnectionEntity {
        let now = Utc::now();
        ConnectionEntity {
            id: Uuid::now_v7(),
            requester_id: requester,
            addressee_id: addressee,
            status,
            created_at: now,
            updated_at: now,
            responded_at: (status != ConnectionStatus::Pending).then_some(now),
        }
    }

    fn ids() -> (Uuid, Uuid, Uuid) {
        (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7())
    }

    #[test]
    fn test_request_without_edge_inserts_pending() {
        let (a, b, _) = ids();
        let t = decide(Action::Request { target: b }, a, None).unwrap();
        assert_eq!(
            t,
            Transition::Insert {
                requester_id: a,
                addressee_id: b,
                status: ConnectionStatus::Pending
            }
        );
    }

    #[test]
    fn test_request_to_self_is_bad_request() {
        let (a, _, _) = ids();
        let err = decide(Action::Request { target: a }, a, None).unwrap_err();
        assert!(matches!(err, error::SystemError::BadRequest(_)));
    }

    #[test]
    fn test_request_with_existing_edge_conflicts_both_directions() {
        let (a, b, _) = ids();
        for status in [ConnectionStatus::Pending, ConnectionStatus::Accepted, ConnectionStatus::Rejected]
        {
            let e = edge(a, b, status);
            let same = decide(Action::Request { target: b }, a, Some(&e)).unwrap_err();
            let reverse = decide(Action::Request { target: a }, b, Some(&e)).unwrap_err();
            assert!(matches!(same, error::SystemError::Conflict(_)), "{status:?}");
            assert!(matches!(reverse, error::SystemError::Conflict(_)), "{status:?}");
        }
    }

    #[test]
    fn test_request_across_block_is_forbidden() {
        let (a, b, _) = ids();
        let e = edge(a, b, ConnectionStatus::Blocked);
        let err = decide(Action::Request { target: a }, b, Some(&e)).unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));
    }

    #[test]
    fn test_only_addressee_responds() {
        let (a, b, _) = ids();
        let e = edge(a, b, ConnectionStatus::Pending);

        let err = decide(Action::Accept, a, Some(&e)).unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));

        match decide(Action::Accept, b, Some(&e)).unwrap() {
            Transition::Update { id, status, .. } => {
                assert_eq!(id, e.id);
                assert_eq!(status, ConnectionStatus::Accepted);
            }
            other => panic!("unexpected transition {other:?}"),
        }

        match decide(Action::Reject, b, Some(&e)).unwrap() {
            Transition::Update { status, .. } => assert_eq!(status, ConnectionStatus::Rejected),
            other => panic!("unexpected transition {other:?}"),
        }
    }

    #[test]
    fn test_outsider_cannot_touch_edge() {
        let (a, b, c) = ids();
        let e = edge(a, b, ConnectionStatus::Pending);
        for action in [Action::Accept, Action::Reject, Action::Cancel] {
            let err = decide(action, c, Some(&e)).unwrap_err();
            assert!(matches!(err, error::SystemError::Forbidden(_)), "{action:?}");
        }
    }

    #[test]
    fn test_respond_to_answered_request_conflicts() {
        let (a, b, _) = ids();
        let e = edge(a, b, ConnectionStatus::Accepted);
        let err = decide(Action::Reject, b, Some(&e)).unwrap_err();
        assert!(matches!(err, error::SystemError::Conflict(_)));
    }

    #[test]
    fn test_missing_edge_is_not_found() {
        let (a, _, _) = ids();
        for action in [Action::Accept, Action::Reject, Action::Cancel, Action::Remove, Action::Unblock]
        {
            let err = decide(action, a, None).unwrap_err();
            assert!(matches!(err, error::SystemError::NotFound(_)), "{action:?}");
        }
    }

    #[test]
    fn test_only_requester_cancels() {
        let (a, b, _) = ids();
        let e = edge(a, b, ConnectionStatus::Pending);

        let err = decide(Action::Cancel, b, Some(&e)).unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));
        assert_eq!(decide(Action::Cancel, a, Some(&e)).unwrap(), Transition::Delete { id: e.id });
    }

    #[test]
    fn test_remove_requires_accepted_edge() {
        let (a, b, _) = ids();
        let accepted = edge(a, b, ConnectionStatus::Accepted);
        assert_eq!(
            decide(Action::Remove, b, Some(&accepted)).unwrap(),
            Transition::Delete { id: accepted.id }
        );

        let pending = edge(a, b, ConnectionStatus::Pending);
        assert!(decide(Action::Remove, a, Some(&pending)).is_err());

        let blocked = edge(a, b, ConnectionStatus::Blocked);
        assert!(decide(Action::Remove, b, Some(&blocked)).is_err());
    }

    #[test]
    fn test_block_overrides_prior_state_with_caller_as_blocker() {
        let (a, b, _) = ids();
        let e = edge(a, b, ConnectionStatus::Accepted);
        let t = decide(Action::Block { target: a }, b, Some(&e)).unwrap();
        assert_eq!(
            t,
            Transition::Update {
                id: e.id,
                requester_id: b,
                addressee_id: a,
                status: ConnectionStatus::Blocked
            }
        );
    }

    #[test]
    fn test_block_is_idempotent_for_blocker() {
        let (a, b, _) = ids();
        let e = edge(a, b, ConnectionStatus::Blocked);
        assert_eq!(decide(Action::Block { target: b }, a, Some(&e)).unwrap(), Transition::Keep(e.clone()));

        let err = decide(Action::Block { target: a }, b, Some(&e)).unwrap_err();
        assert!(matches!(err, error::SystemError::Conflict(_)));
    }

    #[test]
    fn test_only_blocker_unblocks() {
        let (a, b, _) = ids();
        let e = edge(a, b, ConnectionStatus::Blocked);

        let err = decide(Action::Unblock, b, Some(&e)).unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));
        assert_eq!(decide(Action::Unblock, a, Some(&e)).unwrap(), Transition::Delete { id: e.id });

        let accepted = edge(a, b, ConnectionStatus::Accepted);
        let err = decide(Action::Unblock, a, Some(&accepted)).unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
    }
}
