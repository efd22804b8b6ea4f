//! Loss-freedom under concurrent writers: mixed staff edits, client
//! replies, and bulk updates racing against one collection.

#[cfg(test)]
mod tests {
    use case_engine::{CasePatch, CaseService, InMemoryAttachmentStore, Submission};
    use casetrack_auth::CapturingNotifier;
    use record_store::{Collection, InMemoryBackend};
    use shared_types::{EmailAddress, SystemClock};
    use std::sync::Arc;

    fn service() -> Arc<CaseService> {
        let collection = Collection::open("cases", InMemoryBackend::new()).unwrap();
        Arc::new(CaseService::new(
            collection,
            Arc::new(InMemoryAttachmentStore::new()),
            Arc::new(CapturingNotifier::new()),
            Arc::new(SystemClock),
            EmailAddress::parse("desk@agency.com").unwrap(),
        ))
    }

    fn submission(email: &str) -> Submission {
        Submission {
            name: Some("Ada".to_string()),
            email: Some(email.to_string()),
            ..Submission::default()
        }
    }

    #[tokio::test]
    async fn mixed_writers_lose_nothing() {
        let service = service();
        let id = service
            .create(submission("ada@example.com"), Vec::new())
            .await
            .unwrap();
        let owner = EmailAddress::parse("ada@example.com").unwrap();

        let mut handles = Vec::new();
        for i in 0..15 {
            let service = service.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                service
                    .update(
                        &id,
                        CasePatch {
                            notes: Some(format!("note {i}")),
                            ..CasePatch::default()
                        },
                    )
                    .await
                    .map(|_| ())
            }));
        }
        for i in 0..15 {
            let service = service.clone();
            let id = id.clone();
            let owner = owner.clone();
            handles.push(tokio::spawn(async move {
                service.reply(&id, &owner, &format!("reply {i}")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let case = service.get_full(&id).await.unwrap();
        assert_eq!(case.notes.len(), 15);
        assert_eq!(case.client_replies.len(), 15);
    }

    #[tokio::test]
    async fn concurrent_submissions_all_land_with_distinct_ids() {
        let service = service();

        let mut handles = Vec::new();
        for i in 0..30 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .create(submission(&format!("client{i}@example.com")), Vec::new())
                    .await
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap());
        }

        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids.dedup();
        assert_eq!(ids.len(), 30);

        let page = service
            .list(&case_engine::CaseQuery {
                limit: 100,
                ..case_engine::CaseQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 30);
    }

    #[tokio::test]
    async fn bulk_update_races_with_single_updates() {
        let service = service();
        let mut ids = Vec::new();
        for i in 0..10 {
            ids.push(
                service
                    .create(submission(&format!("c{i}@example.com")), Vec::new())
                    .await
                    .unwrap(),
            );
        }

        let bulk = {
            let service = service.clone();
            let ids = ids.clone();
            tokio::spawn(async move {
                service
                    .bulk_update(ids, Some("on-hold".to_string()), None)
                    .await
            })
        };
        let single = {
            let service = service.clone();
            let id = ids[0].clone();
            tokio::spawn(async move {
                service
                    .update(
                        &id,
                        CasePatch {
                            notes: Some("checked".to_string()),
                            ..CasePatch::default()
                        },
                    )
                    .await
            })
        };

        assert_eq!(bulk.await.unwrap().unwrap(), 10);
        single.await.unwrap().unwrap();

        // Both effects are present regardless of interleaving.
        let case = service.get_full(&ids[0]).await.unwrap();
        assert_eq!(case.status, "on-hold");
        assert_eq!(case.notes.len(), 1);
    }
}
