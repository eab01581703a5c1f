use fieldreport::db::Database;
use fieldreport::error::Error;
use fieldreport::models::*;
use speculate2::speculate;
use uuid::Uuid;

fn create_test_user(db: &Database, phone: &str) -> User {
    db.create_user(phone, "v1$1$xx$yy", None)
        .expect("Failed to create user")
}

fn start_test_session(db: &Database, user: &User) -> SessionSnapshot {
    db.start_session(user.id, "Test Site", get_template(""), None)
        .expect("Failed to start session")
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "users" {
        it "rejects duplicate phone numbers" {
            create_test_user(&db, "0501234567");
            let result = db.create_user("0501234567", "hash", None);
            assert!(matches!(result, Err(Error::Validation(_))));
        }

        it "finds users by phone and id" {
            let user = create_test_user(&db, "0501234567");
            let by_phone = db.get_user_by_phone("0501234567").unwrap().unwrap();
            assert_eq!(by_phone.id, user.id);
            let by_id = db.get_user_by_id(user.id).unwrap().unwrap();
            assert_eq!(by_id.phone, "0501234567");
        }

        it "marks users verified" {
            let user = create_test_user(&db, "0501234567");
            assert!(!user.verified);
            db.mark_verified(user.id).unwrap();
            assert!(db.get_user_by_id(user.id).unwrap().unwrap().verified);
        }
    }

    describe "tokens" {
        it "resolves a stored token to its user" {
            let user = create_test_user(&db, "0501234567");
            db.insert_token("tok-abc", user.id).unwrap();
            let resolved = db.user_for_token("tok-abc").unwrap().unwrap();
            assert_eq!(resolved.id, user.id);
            assert!(db.user_for_token("tok-unknown").unwrap().is_none());
        }
    }

    describe "sessions" {
        it "allows only one open session per user" {
            let user = create_test_user(&db, "0501234567");
            start_test_session(&db, &user);
            let again = db.start_session(user.id, "Other", get_template(""), None);
            assert!(matches!(again, Err(Error::ActiveSessionExists)));
        }

        it "errors with NoActiveSession when nothing is open" {
            let user = create_test_user(&db, "0501234567");
            assert!(matches!(db.get_session(user.id), Err(Error::NoActiveSession)));
            assert!(matches!(db.take_session(user.id), Err(Error::NoActiveSession)));
        }

        it "take_session removes the session and returns its state" {
            let user = create_test_user(&db, "0501234567");
            start_test_session(&db, &user);
            db.add_item(user.id, "One", "").unwrap();

            let snapshot = db.take_session(user.id).unwrap();
            assert_eq!(snapshot.items.len(), 1);
            assert!(matches!(db.get_session(user.id), Err(Error::NoActiveSession)));
        }

        it "seed_session restores items with their numbers" {
            let user = create_test_user(&db, "0501234567");
            start_test_session(&db, &user);
            db.add_item(user.id, "One", "").unwrap();
            db.add_item(user.id, "Two", "").unwrap();
            db.delete_item(user.id, db.get_session(user.id).unwrap().items[0].id).unwrap();
            let taken = db.take_session(user.id).unwrap();

            db.seed_session(&taken).unwrap();
            let restored = db.get_session(user.id).unwrap();
            assert_eq!(restored.items.len(), 1);
            assert_eq!(restored.items[0].number, 2);
        }
    }

    describe "items" {
        it "assigns numbers that are never reused" {
            let user = create_test_user(&db, "0501234567");
            start_test_session(&db, &user);

            let a = db.add_item(user.id, "A", "").unwrap();
            let b = db.add_item(user.id, "B", "").unwrap();
            assert_eq!((a.number, b.number), (1, 2));

            db.delete_item(user.id, b.id).unwrap();
            let c = db.add_item(user.id, "C", "").unwrap();
            assert_eq!(c.number, 3);
        }

        it "scopes numbering per user" {
            let alice = create_test_user(&db, "0501111111");
            let bob = create_test_user(&db, "0502222222");
            start_test_session(&db, &alice);
            start_test_session(&db, &bob);

            db.add_item(alice.id, "A1", "").unwrap();
            db.add_item(alice.id, "A2", "").unwrap();
            let b1 = db.add_item(bob.id, "B1", "").unwrap();
            assert_eq!(b1.number, 1);
        }

        it "detaches photos when their item is deleted" {
            let user = create_test_user(&db, "0501234567");
            start_test_session(&db, &user);
            let item = db.add_item(user.id, "A", "").unwrap();
            db.add_photo(user.id, Some(item.id), "/tmp/p.jpg").unwrap();

            db.delete_item(user.id, item.id).unwrap();
            let snapshot = db.get_session(user.id).unwrap();
            assert_eq!(snapshot.photos.len(), 1);
            assert!(snapshot.photos[0].item_id.is_none());
        }

        it "refuses updates to unknown items" {
            let user = create_test_user(&db, "0501234567");
            start_test_session(&db, &user);
            let result = db.update_item(user.id, Uuid::new_v4(), "X", "");
            assert!(matches!(result, Err(Error::NotFound(_))));
        }
    }

    describe "contacts" {
        it "resolves ids preserving the requested order" {
            let user = create_test_user(&db, "0501234567");
            let a = db.create_contact(user.id, CreateContactInput {
                name: "A".to_string(),
                email: "a@example.com".to_string(),
                company: None,
                role_title: None,
                phone: None,
            }).unwrap();
            let b = db.create_contact(user.id, CreateContactInput {
                name: "B".to_string(),
                email: "b@example.com".to_string(),
                company: None,
                role_title: None,
                phone: None,
            }).unwrap();

            let resolved = db.contacts_by_ids(user.id, &[b.id, a.id]).unwrap();
            let names: Vec<&str> = resolved.iter().map(|c| c.name.as_str()).collect();
            assert_eq!(names, vec!["B", "A"]);
        }

        it "silently skips ids that do not exist" {
            let user = create_test_user(&db, "0501234567");
            let resolved = db.contacts_by_ids(user.id, &[Uuid::new_v4()]).unwrap();
            assert!(resolved.is_empty());
        }
    }

    describe "reports" {
        it "stores and lists finalized reports newest first" {
            let user = create_test_user(&db, "0501234567");
            start_test_session(&db, &user);
            let snapshot = db.take_session(user.id).unwrap();

            db.save_report(user.id, Uuid::new_v4(), &snapshot, "/tmp/a.docx").unwrap();
            db.save_report(user.id, Uuid::new_v4(), &snapshot, "/tmp/b.docx").unwrap();

            let reports = db.list_reports(user.id).unwrap();
            assert_eq!(reports.len(), 2);
        }

        it "round-trips the stored snapshot" {
            let user = create_test_user(&db, "0501234567");
            start_test_session(&db, &user);
            db.add_item(user.id, "Crack", "Load-bearing wall").unwrap();
            let snapshot = db.take_session(user.id).unwrap();

            let report_id = Uuid::new_v4();
            db.save_report(user.id, report_id, &snapshot, "/tmp/a.docx").unwrap();
            let restored = db.get_report_snapshot(user.id, report_id).unwrap().unwrap();
            assert_eq!(restored.items.len(), 1);
            assert_eq!(restored.items[0].description, "Crack");
        }

        it "organize updates folder and tags" {
            let user = create_test_user(&db, "0501234567");
            start_test_session(&db, &user);
            let snapshot = db.take_session(user.id).unwrap();
            let report_id = Uuid::new_v4();
            db.save_report(user.id, report_id, &snapshot, "/tmp/a.docx").unwrap();

            let updated = db.organize_report(
                user.id,
                report_id,
                "inspections",
                &["urgent".to_string()],
            ).unwrap();
            assert_eq!(updated.folder, "inspections");
            assert_eq!(updated.tags, vec!["urgent"]);
        }

        it "delete reports whether a row was removed" {
            let user = create_test_user(&db, "0501234567");
            assert!(!db.delete_report(user.id, Uuid::new_v4()).unwrap());
        }

        it "is scoped to the owning user" {
            let alice = create_test_user(&db, "0501111111");
            let bob = create_test_user(&db, "0502222222");
            start_test_session(&db, &alice);
            let snapshot = db.take_session(alice.id).unwrap();
            let report_id = Uuid::new_v4();
            db.save_report(alice.id, report_id, &snapshot, "/tmp/a.docx").unwrap();

            assert!(db.get_report_snapshot(bob.id, report_id).unwrap().is_none());
            assert!(!db.delete_report(bob.id, report_id).unwrap());
        }
    }

    describe "recent locations" {
        it "keeps at most five, newest first, case-insensitive deduped" {
            let user = create_test_user(&db, "0501234567");
            for loc in ["A", "B", "C", "D", "E", "F"] {
                db.add_location(user.id, loc).unwrap();
            }
            db.add_location(user.id, "b").unwrap();

            let locations = db.get_locations(user.id).unwrap();
            assert_eq!(locations, vec!["b", "F", "E", "D", "C"]);
        }

        it "drops entries that sanitize to empty" {
            let user = create_test_user(&db, "0501234567");
            db.add_location(user.id, "  \u{202e}\u{fffd}  ").unwrap();
            assert!(db.get_locations(user.id).unwrap().is_empty());
        }
    }
}
