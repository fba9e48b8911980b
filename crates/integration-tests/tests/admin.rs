//! Admin endpoints: user management, moderation and reports.

use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;

use brana_core::api::{CreateArtworkRequest, SalesReportQuery};
use brana_core::{OrderStatus, Role};
use brana_integration_tests::{TestServer, cash_on_delivery};

fn priced(title: &str, price: i64) -> CreateArtworkRequest {
    CreateArtworkRequest {
        title: title.to_owned(),
        description: "Oil on canvas".to_owned(),
        image_ref: "/images/oil.jpg".to_owned(),
        price: Some(Decimal::from(price)),
    }
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let server = TestServer::spawn().await;
    let client = &server.client;
    let (token, profile) = server.signup("abebe").await;

    assert!(client.admin_users(&token).await.unwrap_err().is_status(403));
    assert!(client.admin_artworks(&token).await.unwrap_err().is_status(403));
    assert!(client.admin_orders(&token).await.unwrap_err().is_status(403));
    assert!(client.stats(&token).await.unwrap_err().is_status(403));
    assert!(
        client
            .update_role(&token, profile.id, "admin")
            .await
            .unwrap_err()
            .is_status(403)
    );
    assert!(
        client
            .sales_report(&token, SalesReportQuery::default())
            .await
            .unwrap_err()
            .is_status(403)
    );
}

#[tokio::test]
async fn test_role_changes() {
    let server = TestServer::spawn().await;
    let client = &server.client;
    let (admin, admin_profile) = server.signup_admin("admin").await;
    let (token, profile) = server.signup("liya").await;

    let promoted = client.update_role(&admin, profile.id, "admin").await.unwrap();
    assert_eq!(promoted.role, Role::Admin);
    // The existing token picks up the new role
    assert!(client.stats(&token).await.is_ok());

    let err = client
        .update_role(&admin, profile.id, "superuser")
        .await
        .unwrap_err();
    assert!(err.is_status(400));

    let err = client
        .update_role(&admin, admin_profile.id, "user")
        .await
        .unwrap_err();
    assert!(err.is_status(409));

    let demoted = client.update_role(&token, profile.id, "user").await;
    assert!(demoted.unwrap_err().is_status(409));
    let demoted = client.update_role(&admin, profile.id, "user").await.unwrap();
    assert_eq!(demoted.role, Role::User);
    assert!(client.stats(&token).await.unwrap_err().is_status(403));
}

#[tokio::test]
async fn test_delete_user_cascades() {
    let server = TestServer::spawn().await;
    let client = &server.client;
    let (admin, admin_profile) = server.signup_admin("admin").await;
    let (alice, alice_profile) = server.signup("alice").await;
    let (bob, bob_profile) = server.signup("bob").await;

    let work = client.create_artwork(&alice, &priced("Lake Tana", 300)).await.unwrap();
    client.add_to_cart(&bob, work.id, None).await.unwrap();
    let order = client.create_order(&bob, &cash_on_delivery()).await.unwrap();

    assert!(
        client
            .delete_user(&admin, admin_profile.id)
            .await
            .unwrap_err()
            .is_status(409)
    );

    client.delete_user(&admin, alice_profile.id).await.unwrap();
    assert!(client.artwork(work.id).await.unwrap_err().is_status(404));

    client.delete_user(&admin, bob_profile.id).await.unwrap();
    let orders = client.admin_orders(&admin).await.unwrap();
    let kept = orders.iter().find(|o| o.id == order.id).expect("order was deleted");
    assert_eq!(kept.user_id, None);
    assert_eq!(kept.total, order.total);

    let users = client.admin_users(&admin).await.unwrap();
    assert_eq!(users.len(), 1);
    assert!(
        client
            .delete_user(&admin, bob_profile.id)
            .await
            .unwrap_err()
            .is_status(404)
    );
}

#[tokio::test]
async fn test_moderate_artworks() {
    let server = TestServer::spawn().await;
    let client = &server.client;
    let (admin, _) = server.signup_admin("admin").await;
    let (alice, _) = server.signup("alice").await;
    let (bob, _) = server.signup("bob").await;

    let work = client.create_artwork(&alice, &priced("Spam", 1)).await.unwrap();
    client.like(&bob, work.id).await.unwrap();
    client.add_to_cart(&bob, work.id, None).await.unwrap();

    assert_eq!(client.admin_artworks(&admin).await.unwrap().len(), 1);
    client.admin_delete_artwork(&admin, work.id).await.unwrap();
    assert!(client.admin_artworks(&admin).await.unwrap().is_empty());
    assert!(client.cart(&bob).await.unwrap().items.is_empty());

    let err = client.admin_delete_artwork(&admin, work.id).await.unwrap_err();
    assert!(err.is_status(404));
}

#[tokio::test]
async fn test_order_fulfilment() {
    let server = TestServer::spawn().await;
    let client = &server.client;
    let (admin, _) = server.signup_admin("admin").await;
    let (alice, _) = server.signup("alice").await;
    let (bob, _) = server.signup("bob").await;

    let work = client.create_artwork(&alice, &priced("Harvest", 250)).await.unwrap();
    client.add_to_cart(&bob, work.id, None).await.unwrap();
    let order = client.create_order(&bob, &cash_on_delivery()).await.unwrap();

    let err = client
        .update_order_status(&admin, order.id, "lost")
        .await
        .unwrap_err();
    assert!(err.is_status(400));

    let shipped = client
        .update_order_status(&admin, order.id, "shipped")
        .await
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);

    let tracked = client
        .add_tracking(&admin, order.id, "ET123456789")
        .await
        .unwrap();
    assert_eq!(tracked.tracking_number.as_deref(), Some("ET123456789"));
    assert!(client.add_tracking(&admin, order.id, " ").await.unwrap_err().is_status(400));
    assert!(client.add_tracking(&bob, order.id, "X").await.unwrap_err().is_status(403));

    let seen = client.order(&bob, order.id).await.unwrap();
    assert_eq!(seen.status, OrderStatus::Shipped);
    assert_eq!(seen.tracking_number.as_deref(), Some("ET123456789"));
}

#[tokio::test]
async fn test_stats_and_sales_report() {
    let server = TestServer::spawn().await;
    let client = &server.client;
    let (admin, _) = server.signup_admin("admin").await;
    let (alice, _) = server.signup("alice").await;
    let (bob, _) = server.signup("bob").await;

    let a = client.create_artwork(&alice, &priced("Dawn", 100)).await.unwrap();
    let b = client.create_artwork(&alice, &priced("Dusk", 200)).await.unwrap();

    client.add_to_cart(&bob, a.id, None).await.unwrap();
    let first = client.create_order(&bob, &cash_on_delivery()).await.unwrap();
    client.add_to_cart(&bob, b.id, Some(2)).await.unwrap();
    let second = client.create_order(&bob, &cash_on_delivery()).await.unwrap();
    client
        .update_order_status(&admin, second.id, "delivered")
        .await
        .unwrap();

    let stats = client.stats(&admin).await.unwrap();
    assert_eq!(stats.total_users, 3);
    assert_eq!(stats.total_artworks, 2);
    assert_eq!(stats.total_orders, 2);
    assert_eq!(stats.total_revenue, first.total + second.total);

    let today = Utc::now().date_naive();
    let report = client
        .sales_report(
            &admin,
            SalesReportQuery {
                start_date: today.checked_sub_days(Days::new(1)),
                end_date: today.checked_add_days(Days::new(1)),
            },
        )
        .await
        .unwrap();
    assert_eq!(report.total_orders, 2);
    assert_eq!(report.pending_orders, 1);
    assert_eq!(report.completed_orders, 1);
    assert_eq!(report.total_revenue, stats.total_revenue);

    let old = SalesReportQuery {
        start_date: NaiveDate::from_ymd_opt(2001, 1, 1),
        end_date: NaiveDate::from_ymd_opt(2001, 12, 31),
    };
    let empty = client.sales_report(&admin, old).await.unwrap();
    assert!(empty.orders.is_empty());
    assert_eq!(empty.total_revenue, Decimal::ZERO);

    let reversed = SalesReportQuery {
        start_date: today.checked_add_days(Days::new(1)),
        end_date: Some(today),
    };
    let err = client.sales_report(&admin, reversed).await.unwrap_err();
    assert!(err.is_status(400));
}
