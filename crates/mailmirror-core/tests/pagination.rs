//! Property tests for newest-first pagination.

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;

use common::{MockServer, account, config, uid};
use mailmirror_core::Folder;
use mailmirror_imap::Uid;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn pages_partition_the_mailbox(count in 0u32..40, batch in 1usize..12) {
        let seen = tokio_test::block_on(async {
            let server = Arc::new(MockServer::new());
            server.deliver_many("INBOX", count);
            let folder = Folder::open("INBOX", "Inbox", account(&server, config(batch)), None)
                .await
                .unwrap();

            let mut seen: Vec<Uid> = Vec::new();
            loop {
                let page = folder.page(false, None).await.unwrap();
                assert_eq!(page.offset - page.previous_offset, page.headers.len());
                if page.headers.is_empty() {
                    break;
                }
                assert!(page.headers.len() <= batch);
                seen.extend(page.headers.iter().map(|h| h.uid));
            }
            seen
        });

        let expected: Vec<Uid> = (1..=count).rev().map(uid).collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn deletions_keep_offset_in_bounds(
        count in 1u32..30,
        batch in 1usize..8,
        pages in 0usize..5,
        doomed in proptest::collection::vec(1u32..30, 0..10),
    ) {
        let (offset, len, rest) = tokio_test::block_on(async {
            let server = Arc::new(MockServer::new());
            server.deliver_many("INBOX", count);
            let folder = Folder::open("INBOX", "Inbox", account(&server, config(batch)), None)
                .await
                .unwrap();

            for _ in 0..pages {
                folder.page(false, None).await.unwrap();
            }
            let shown = folder.offset().await;
            let before: Vec<Uid> = folder.uids().await.into_iter().rev().take(shown).collect();

            for n in doomed.iter().copied().filter(|&n| n <= count) {
                folder.delete_messages(&[uid(n)]).await.unwrap();
            }

            let offset = folder.offset().await;
            let remaining: Vec<Uid> = folder.uids().await.into_iter().rev().collect();
            let still_shown: Vec<Uid> = before
                .into_iter()
                .filter(|u| remaining.contains(u))
                .collect();
            assert_eq!(&remaining[..offset], &still_shown[..]);

            let rest = folder.page(false, Some(usize::MAX)).await.unwrap();
            (offset, remaining.len(), rest.headers.len())
        });

        prop_assert!(offset <= len);
        prop_assert_eq!(offset + rest, len);
    }
}
