//! Organizer Integration Tests
//!
//! Full gestures against the in-memory repository.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::OrganizerConfig;
    use crate::dnd::{DragMode, PolicyViolation, TransferMode};
    use crate::domain::{ItemId, ItemKind, ItemRecord, NodeId, Permissions};
    use crate::notify::{NotificationLevel, NotificationReceiver};
    use crate::organizer::{Organizer, OrganizerError};
    use crate::reconcile::ReconcileStage;
    use crate::repository::memory::{RemoteCall, RemoteOp};
    use crate::repository::InMemoryRepository;

    fn node(id: &str) -> NodeId {
        NodeId::from(id)
    }

    fn folder_permissions() -> Permissions {
        Permissions {
            view: true,
            edit: true,
            movable: true,
            copyable: true,
            accepts_components: true,
            accepts_folders: true,
            accepts_moves: true,
            accepts_copies: true,
        }
    }

    fn project_permissions() -> Permissions {
        Permissions {
            view: true,
            movable: true,
            copyable: true,
            ..Permissions::default()
        }
    }

    fn folder(id: &str, expand: bool) -> ItemRecord {
        let mut record = ItemRecord::new(id, id.to_uppercase(), ItemKind::Folder)
            .with_permissions(folder_permissions());
        record.expand = expand;
        record
    }

    fn project(id: &str) -> ItemRecord {
        ItemRecord::new(id, id.to_uppercase(), ItemKind::Project)
            .with_permissions(project_permissions())
    }

    /// dashboard
    /// └── root
    ///     ├── src: p1, p2, p3
    ///     ├── dst: p2
    ///     ├── smart (smart folder)
    ///     └── locked (private, collapsed)
    fn seed() -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        repo.insert(&node("dashboard"), folder("root", true));
        repo.insert(&node("root"), folder("src", true));
        repo.insert(&node("root"), folder("dst", true));
        let smart = ItemRecord::new("smart", "All my projects", ItemKind::SmartFolder);
        repo.insert(
            &node("root"),
            smart.with_permissions(Permissions {
                view: true,
                ..Permissions::default()
            }),
        );
        repo.insert(
            &node("root"),
            folder("locked", false).with_permissions(Permissions {
                view: false,
                ..folder_permissions()
            }),
        );
        for p in ["p1", "p2", "p3"] {
            repo.insert(&node("src"), project(p));
        }
        repo.insert(&node("dst"), project("p2"));
        repo.insert_detached(project("p9"));
        repo
    }

    type Fixture = (
        Organizer<InMemoryRepository>,
        Arc<InMemoryRepository>,
        NotificationReceiver,
    );

    async fn setup_with(config: OrganizerConfig) -> Fixture {
        let repo = Arc::new(seed());
        let (organizer, rx) = Organizer::new(repo.clone(), &config);
        organizer
            .load_root(&node("dashboard"))
            .await
            .expect("Failed to load root");
        repo.clear_calls();
        (organizer, repo, rx)
    }

    async fn setup() -> Fixture {
        setup_with(OrganizerConfig::default()).await
    }

    /// Resolve a path of backend ids to the loaded item
    async fn item(organizer: &Organizer<InMemoryRepository>, path: &[&str]) -> ItemId {
        organizer
            .with_tree(|tree| {
                let mut current = None;
                for step in path {
                    current = Some(tree.find_child(current, &node(step))?);
                }
                current
            })
            .await
            .unwrap_or_else(|| panic!("{:?} is not loaded", path))
    }

    async fn child_nodes(organizer: &Organizer<InMemoryRepository>, folder: ItemId) -> Vec<String> {
        organizer
            .with_tree(|tree| {
                tree.children(folder)
                    .iter()
                    .filter_map(|id| tree.get(*id))
                    .map(|item| item.node_id.to_string())
                    .collect()
            })
            .await
    }

    #[tokio::test]
    async fn test_load_cascades_expanded_folders() {
        let (organizer, repo, _rx) = setup().await;

        let src = item(&organizer, &["root", "src"]).await;
        let locked = item(&organizer, &["root", "locked"]).await;
        assert_eq!(child_nodes(&organizer, src).await, vec!["p1", "p2", "p3"]);
        assert!(child_nodes(&organizer, locked).await.is_empty());
        assert!(repo.calls().is_empty());

        // root, src, p1..p3, dst, p2, smart, locked
        assert_eq!(organizer.visible_rows().await.len(), 9);
    }

    #[tokio::test]
    async fn test_expand_depth_bound() {
        let config = OrganizerConfig {
            max_expand_depth: 1,
            ..OrganizerConfig::default()
        };
        let (organizer, _repo, _rx) = setup_with(config).await;

        let src = item(&organizer, &["root", "src"]).await;
        assert!(child_nodes(&organizer, src).await.is_empty());
    }

    #[tokio::test]
    async fn test_multi_item_move() {
        let (organizer, repo, _rx) = setup().await;
        let p1 = item(&organizer, &["root", "src", "p1"]).await;
        let p3 = item(&organizer, &["root", "src", "p3"]).await;
        let dst = item(&organizer, &["root", "dst"]).await;

        organizer.select(p1).await;
        organizer.toggle_select(p3).await;
        let mut session = organizer.drag_start(p1).await.unwrap();
        assert_eq!(session.items(), &[p1, p3]);
        assert_eq!(organizer.drag_over(&mut session, dst).await, DragMode::Move);

        let outcome = organizer.drop_on(session, dst).await.unwrap();
        assert_eq!(outcome.mode, TransferMode::Move);
        assert_eq!(outcome.transferred, vec![node("p1"), node("p3")]);
        assert_eq!(
            repo.writes(),
            vec![RemoteCall::MovePointers {
                ids: vec![node("p1"), node("p3")],
                from: node("src"),
                to: node("dst"),
            }]
        );

        // Siblings: the source folder is reloaded
        let src = item(&organizer, &["root", "src"]).await;
        assert_eq!(child_nodes(&organizer, src).await, vec!["p2"]);
        assert_eq!(repo.membership(&node("dst")), vec![node("p2"), node("p1"), node("p3")]);
    }

    #[tokio::test]
    async fn test_move_removes_items_already_in_target() {
        let (organizer, repo, _rx) = setup().await;
        let p1 = item(&organizer, &["root", "src", "p1"]).await;
        let p2 = item(&organizer, &["root", "src", "p2"]).await;
        let dst = item(&organizer, &["root", "dst"]).await;

        organizer.select(p1).await;
        organizer.toggle_select(p2).await;
        let session = organizer.drag_start(p1).await.unwrap();
        let outcome = organizer.drop_on(session, dst).await.unwrap();

        assert_eq!(outcome.already_present, vec![node("p2")]);
        assert_eq!(
            repo.writes(),
            vec![
                RemoteCall::DeletePointers {
                    ids: vec![node("p2")],
                    folder: node("src"),
                },
                RemoteCall::MovePointers {
                    ids: vec![node("p1")],
                    from: node("src"),
                    to: node("dst"),
                },
            ]
        );
        let src = item(&organizer, &["root", "src"]).await;
        assert_eq!(child_nodes(&organizer, src).await, vec!["p3"]);
    }

    #[tokio::test]
    async fn test_copy_with_alt_refreshes_target() {
        let (organizer, repo, _rx) = setup().await;
        let p1 = item(&organizer, &["root", "src", "p1"]).await;
        let dst = item(&organizer, &["root", "dst"]).await;

        let mut session = organizer.drag_start(p1).await.unwrap();
        session.set_alt_held(true);
        assert_eq!(organizer.drag_over(&mut session, dst).await, DragMode::Copy);

        let outcome = organizer.drop_on(session, dst).await.unwrap();
        assert_eq!(outcome.mode, TransferMode::Copy);
        assert_eq!(outcome.refresh, dst);
        assert_eq!(child_nodes(&organizer, dst).await, vec!["p2", "p1"]);
        assert_eq!(repo.membership(&node("src")).len(), 3);
    }

    #[tokio::test]
    async fn test_move_into_nested_folder_refreshes_outer() {
        let (organizer, repo, _rx) = setup().await;
        let src = item(&organizer, &["root", "src"]).await;
        repo.insert(&node("src"), folder("sub", true));
        organizer.refresh_folder(src).await.unwrap();
        repo.clear_calls();

        let p1 = item(&organizer, &["root", "src", "p1"]).await;
        let sub = item(&organizer, &["root", "src", "sub"]).await;
        let mut session = organizer.drag_start(p1).await.unwrap();
        assert_eq!(organizer.drag_over(&mut session, sub).await, DragMode::Move);

        let outcome = organizer.drop_on(session, sub).await.unwrap();
        assert_eq!(outcome.refresh, src);
        assert_eq!(child_nodes(&organizer, src).await, vec!["p2", "p3", "sub"]);

        // The nested folder is reloaded through the cascade from src
        let sub = item(&organizer, &["root", "src", "sub"]).await;
        assert_eq!(child_nodes(&organizer, sub).await, vec!["p1"]);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_everything_unchanged() {
        let (organizer, repo, mut rx) = setup().await;
        let p1 = item(&organizer, &["root", "src", "p1"]).await;
        let dst = item(&organizer, &["root", "dst"]).await;
        let before = organizer.visible_rows().await;
        repo.fail(RemoteOp::FetchPointerIds);

        let session = organizer.drag_start(p1).await.unwrap();
        let err = organizer.drop_on(session, dst).await.unwrap_err();

        match err {
            OrganizerError::Reconcile(e) => assert_eq!(e.stage, ReconcileStage::FetchMembership),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(repo.writes().is_empty());
        assert_eq!(organizer.visible_rows().await, before);

        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.level, NotificationLevel::Error);
        assert!(notification.message.contains("fetch target folder contents"));
    }

    #[tokio::test]
    async fn test_transfer_failure_does_not_refresh() {
        let (organizer, repo, mut rx) = setup().await;
        let p1 = item(&organizer, &["root", "src", "p1"]).await;
        let dst = item(&organizer, &["root", "dst"]).await;
        repo.fail(RemoteOp::MovePointers);

        let session = organizer.drag_start(p1).await.unwrap();
        assert!(organizer.drop_on(session, dst).await.is_err());

        // The old ids are still loaded, so nothing was reloaded
        assert!(organizer.with_tree(|tree| tree.contains(p1)).await);
        assert!(!repo.calls().iter().any(|c| c.op() == RemoteOp::FetchChildren));
        assert_eq!(rx.try_recv().unwrap().level, NotificationLevel::Error);
    }

    #[tokio::test]
    async fn test_same_parent_drop_is_refused_without_calls() {
        let (organizer, repo, _rx) = setup().await;
        let p1 = item(&organizer, &["root", "src", "p1"]).await;
        let src = item(&organizer, &["root", "src"]).await;

        let mut session = organizer.drag_start(p1).await.unwrap();
        assert_eq!(organizer.drag_over(&mut session, src).await, DragMode::Forbidden);

        let err = organizer.drop_on(session, src).await.unwrap_err();
        assert!(matches!(err, OrganizerError::Policy(PolicyViolation::SameParent)));
        assert!(repo.calls().is_empty());
    }

    #[tokio::test]
    async fn test_forbidden_targets() {
        let (organizer, _repo, _rx) = setup().await;
        let root = item(&organizer, &["root"]).await;
        let src = item(&organizer, &["root", "src"]).await;
        let smart = item(&organizer, &["root", "smart"]).await;
        let p1 = item(&organizer, &["root", "src", "p1"]).await;

        let mut session = organizer.drag_start(p1).await.unwrap();
        assert_eq!(organizer.drag_over(&mut session, smart).await, DragMode::Forbidden);
        assert_eq!(session.mode().cursor(), "not-allowed");

        let mut session = organizer.drag_start(root).await.unwrap();
        assert_eq!(organizer.drag_over(&mut session, src).await, DragMode::Forbidden);
        let err = organizer.drop_on(session, src).await.unwrap_err();
        assert!(matches!(err, OrganizerError::Policy(PolicyViolation::Cycle)));
    }

    #[tokio::test]
    async fn test_cross_parent_selection_is_filtered_at_drag_start() {
        let (organizer, _repo, _rx) = setup().await;
        let p1 = item(&organizer, &["root", "src", "p1"]).await;
        let other_p2 = item(&organizer, &["root", "dst", "p2"]).await;

        organizer.select(p1).await;
        organizer.toggle_select(other_p2).await;
        let session = organizer.drag_start(p1).await.unwrap();

        assert_eq!(session.items(), &[p1]);
        assert_eq!(organizer.selection().await.items, vec![p1]);
    }

    #[tokio::test]
    async fn test_non_draggable_anchor_starts_nothing() {
        let (organizer, _repo, _rx) = setup().await;
        let smart = item(&organizer, &["root", "smart"]).await;
        assert!(organizer.drag_start(smart).await.is_none());
        assert!(organizer.drag_start(ItemId(9999)).await.is_none());
    }

    #[tokio::test]
    async fn test_toggle_private_folder_is_refused() {
        let (organizer, repo, mut rx) = setup().await;
        let locked = item(&organizer, &["root", "locked"]).await;

        let err = organizer.toggle_folder(locked).await.unwrap_err();
        assert!(matches!(err, OrganizerError::Policy(PolicyViolation::PrivateFolder)));
        assert!(repo.calls().is_empty());

        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.level, NotificationLevel::Warning);
        assert_eq!(notification.message, "Not allowed: Private folder");
    }

    #[tokio::test]
    async fn test_toggle_collapses_and_reloads() {
        let (organizer, repo, _rx) = setup().await;
        let src = item(&organizer, &["root", "src"]).await;

        assert!(!organizer.toggle_folder(src).await.unwrap());
        assert!(child_nodes(&organizer, src).await.is_empty());
        assert!(!repo.record(&node("src")).unwrap().expand);

        assert!(organizer.toggle_folder(src).await.unwrap());
        assert_eq!(child_nodes(&organizer, src).await, vec!["p1", "p2", "p3"]);
        assert_eq!(
            repo.calls(),
            vec![
                RemoteCall::SetExpanded(node("src"), false),
                RemoteCall::SetExpanded(node("src"), true),
                RemoteCall::FetchChildren(node("src")),
            ]
        );
    }

    #[tokio::test]
    async fn test_add_pointer() {
        let (organizer, repo, mut rx) = setup().await;
        let dst = item(&organizer, &["root", "dst"]).await;

        let err = organizer.add_pointer(dst, &node("p2")).await.unwrap_err();
        assert!(matches!(err, OrganizerError::AlreadyInFolder));
        assert!(repo.writes().is_empty());
        assert_eq!(rx.try_recv().unwrap().message, "This project is already in the folder");

        organizer.add_pointer(dst, &node("p9")).await.unwrap();
        assert_eq!(child_nodes(&organizer, dst).await, vec!["p2", "p9"]);
        assert_eq!(
            repo.writes(),
            vec![RemoteCall::AddPointer {
                folder: node("dst"),
                pointer: node("p9"),
            }]
        );
    }

    #[tokio::test]
    async fn test_remove_pointers_from_selection() {
        let (organizer, repo, _rx) = setup().await;
        let p1 = item(&organizer, &["root", "src", "p1"]).await;
        let p2 = item(&organizer, &["root", "src", "p2"]).await;

        organizer.select(p1).await;
        organizer.toggle_select(p2).await;
        organizer.remove_pointers().await.unwrap();

        assert_eq!(
            repo.writes(),
            vec![RemoteCall::DeletePointers {
                ids: vec![node("p1"), node("p2")],
                folder: node("src"),
            }]
        );
        let src = item(&organizer, &["root", "src"]).await;
        assert_eq!(child_nodes(&organizer, src).await, vec!["p3"]);
        assert!(organizer.selection().await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_refuses_folders() {
        let (organizer, repo, _rx) = setup().await;
        let src = item(&organizer, &["root", "src"]).await;
        let dst = item(&organizer, &["root", "dst"]).await;

        organizer.select(src).await;
        organizer.toggle_select(dst).await;
        let err = organizer.remove_pointers().await.unwrap_err();
        assert!(matches!(err, OrganizerError::Policy(PolicyViolation::NotRemovable)));

        let err = organizer.remove_pointer(src).await.unwrap_err();
        assert!(matches!(err, OrganizerError::Policy(PolicyViolation::NotRemovable)));
        assert!(repo.calls().is_empty());
    }

    #[tokio::test]
    async fn test_remove_single_pointer() {
        let (organizer, repo, _rx) = setup().await;
        let p3 = item(&organizer, &["root", "src", "p3"]).await;

        organizer.remove_pointer(p3).await.unwrap();
        assert_eq!(repo.membership(&node("src")), vec![node("p1"), node("p2")]);
        let src = item(&organizer, &["root", "src"]).await;
        assert_eq!(child_nodes(&organizer, src).await, vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn test_folder_editing() {
        let (organizer, repo, _rx) = setup().await;
        let dst = item(&organizer, &["root", "dst"]).await;

        let err = organizer.create_folder(dst, "   ").await.unwrap_err();
        assert!(matches!(err, OrganizerError::InvalidInput(_)));

        organizer.create_folder(dst, "  Papers ").await.unwrap();
        let names: Vec<String> = organizer
            .with_tree(|tree| {
                tree.children(dst)
                    .iter()
                    .filter_map(|id| tree.get(*id))
                    .map(|i| i.name.clone())
                    .collect()
            })
            .await;
        assert_eq!(names, vec!["P2", "Papers"]);

        let src = item(&organizer, &["root", "src"]).await;
        organizer.rename(src, "Sources").await.unwrap();
        let src = item(&organizer, &["root", "src"]).await;
        let name = organizer.with_tree(|tree| tree.get(src).map(|i| i.name.clone())).await;
        assert_eq!(name.as_deref(), Some("Sources"));

        let err = organizer.rename(src, "Sources").await.unwrap_err();
        assert!(matches!(err, OrganizerError::InvalidInput(_)));

        let p1 = item(&organizer, &["root", "src", "p1"]).await;
        let err = organizer.delete_folder(p1).await.unwrap_err();
        assert!(matches!(err, OrganizerError::Policy(PolicyViolation::NotAFolder)));

        let dst = item(&organizer, &["root", "dst"]).await;
        organizer.delete_folder(dst).await.unwrap();
        let root = item(&organizer, &["root"]).await;
        assert_eq!(child_nodes(&organizer, root).await, vec!["src", "smart", "locked"]);
        assert!(repo.record(&node("p2")).is_some());
    }

    #[tokio::test]
    async fn test_delete_root_folder() {
        let (organizer, repo, _rx) = setup().await;
        let root = item(&organizer, &["root"]).await;

        organizer.delete_folder(root).await.unwrap();
        assert!(organizer.with_tree(|tree| tree.is_empty()).await);
        assert!(repo.membership(&node("dashboard")).is_empty());
    }
}
