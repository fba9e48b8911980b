//! Marketplace invariants checked over HTTP.

use brana_core::api::{CreateArtworkRequest, UpdateArtworkRequest};
use brana_core::{ArtworkId, OrderId};
use brana_integration_tests::{TestServer, cash_on_delivery};
use rust_decimal::Decimal;

fn artwork(title: &str, price: Option<i64>) -> CreateArtworkRequest {
    CreateArtworkRequest {
        title: title.to_owned(),
        description: format!("{title}, mixed media"),
        image_ref: format!("/images/{}.jpg", title.to_lowercase()),
        price: price.map(Decimal::from),
    }
}

#[tokio::test]
async fn test_listing_flags_stay_consistent() {
    let server = TestServer::spawn().await;
    let client = &server.client;
    let (alice, _) = server.signup("alice").await;
    let (bob, _) = server.signup("bob").await;

    let unlisted = client
        .create_artwork(&alice, &artwork("Timkat", None))
        .await
        .unwrap();
    let zero = client
        .create_artwork(&alice, &artwork("Gondar", Some(0)))
        .await
        .unwrap();
    let priced = client
        .create_artwork(&alice, &artwork("Axum", Some(900)))
        .await
        .unwrap();
    assert!(!unlisted.for_sale && unlisted.price.is_none());
    assert!(!zero.for_sale);
    assert!(priced.for_sale);

    let listed = client
        .sell(&alice, unlisted.id, Decimal::from(250))
        .await
        .unwrap();
    assert!(listed.for_sale);
    assert_eq!(listed.price, Some(Decimal::from(250)));

    client.buy(&bob, priced.id).await.unwrap();

    for a in client.artworks().await.unwrap().iter() {
        if a.sold {
            assert!(!a.for_sale, "sold artwork {} still for sale", a.id);
        }
        if a.for_sale {
            assert!(a.price.is_some_and(|p| p > Decimal::ZERO));
        }
    }
}

#[tokio::test]
async fn test_sell_rules() {
    let server = TestServer::spawn().await;
    let client = &server.client;
    let (alice, _) = server.signup("alice").await;
    let (bob, _) = server.signup("bob").await;
    let work = client
        .create_artwork(&alice, &artwork("Harar", None))
        .await
        .unwrap();

    let err = client.sell(&bob, work.id, Decimal::from(10)).await.unwrap_err();
    assert!(err.is_status(403));

    for bad in [Decimal::ZERO, Decimal::from(-5)] {
        let err = client.sell(&alice, work.id, bad).await.unwrap_err();
        assert!(err.is_status(400), "{bad}: {err}");
    }
}

#[tokio::test]
async fn test_like_twice_restores_state() {
    let server = TestServer::spawn().await;
    let client = &server.client;
    let (alice, _) = server.signup("alice").await;
    let (bob, bob_profile) = server.signup("bob").await;
    let work = client
        .create_artwork(&alice, &artwork("Simien", Some(300)))
        .await
        .unwrap();

    let liked = client.like(&bob, work.id).await.unwrap();
    assert_eq!(liked.likes, 1);
    assert_eq!(liked.liked_by, vec![bob_profile.id]);

    let unliked = client.like(&bob, work.id).await.unwrap();
    assert_eq!(unliked.likes, work.likes);
    assert_eq!(unliked.liked_by, work.liked_by);

    let err = client.like(&bob, ArtworkId::new(9999)).await.unwrap_err();
    assert!(err.is_status(404));
}

#[tokio::test]
async fn test_comments_append_in_order() {
    let server = TestServer::spawn().await;
    let client = &server.client;
    let (alice, _) = server.signup("alice").await;
    let (bob, bob_profile) = server.signup("bob").await;
    let work = client
        .create_artwork(&alice, &artwork("Aksum", None))
        .await
        .unwrap();

    client.comment(&bob, work.id, "Beautiful").await.unwrap();
    let after = client.comment(&alice, work.id, "Thank you").await.unwrap();
    let texts: Vec<&str> = after.comments.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, ["Beautiful", "Thank you"]);
    assert_eq!(after.comments[0].user.id, bob_profile.id);

    let err = client.comment(&bob, work.id, "   ").await.unwrap_err();
    assert!(err.is_status(400));
}

#[tokio::test]
async fn test_cart_lines_are_unique_and_totals_derived() {
    let server = TestServer::spawn().await;
    let client = &server.client;
    let (alice, _) = server.signup("alice").await;
    let (bob, _) = server.signup("bob").await;

    let a = client
        .create_artwork(&alice, &artwork("Blue Nile", Some(120)))
        .await
        .unwrap();
    let b = client
        .create_artwork(&alice, &artwork("Danakil", Some(75)))
        .await
        .unwrap();

    client.add_to_cart(&bob, a.id, Some(1)).await.unwrap();
    client.add_to_cart(&bob, a.id, Some(2)).await.unwrap();
    let cart = client.add_to_cart(&bob, b.id, None).await.unwrap();

    assert_eq!(cart.items.len(), 2);
    assert_eq!(cart.total_items, cart.items.iter().map(|l| l.quantity).sum::<u32>());
    assert_eq!(cart.total_items, 4);
    assert_eq!(cart.total_price, Decimal::from(3 * 120 + 75));

    let cart = client.update_cart_item(&bob, b.id, 0).await.unwrap();
    assert_eq!(cart.items.len(), 1);

    // Removing an absent line is fine
    let cart = client.remove_cart_item(&bob, b.id).await.unwrap();
    assert_eq!(cart.items.len(), 1);

    let cart = client.clear_cart(&bob).await.unwrap();
    assert!(cart.items.is_empty());
}

#[tokio::test]
async fn test_cart_rejects_unavailable_artworks() {
    let server = TestServer::spawn().await;
    let client = &server.client;
    let (alice, _) = server.signup("alice").await;
    let (bob, _) = server.signup("bob").await;

    let unlisted = client
        .create_artwork(&alice, &artwork("Sketch", None))
        .await
        .unwrap();
    let err = client
        .add_to_cart(&bob, unlisted.id, None)
        .await
        .unwrap_err();
    assert!(err.is_status(409));

    let priced = client
        .create_artwork(&alice, &artwork("Portrait", Some(40)))
        .await
        .unwrap();
    let err = client
        .add_to_cart(&bob, priced.id, Some(0))
        .await
        .unwrap_err();
    assert!(err.is_status(400));

    let err = client
        .add_to_cart(&bob, ArtworkId::new(4242), None)
        .await
        .unwrap_err();
    assert!(err.is_status(404));
}

#[tokio::test]
async fn test_order_total_is_frozen() {
    let server = TestServer::spawn().await;
    let client = &server.client;
    let (alice, _) = server.signup("alice").await;
    let (bob, _) = server.signup("bob").await;

    let unlisted = client
        .create_artwork(&alice, &artwork("Enkutatash", None))
        .await
        .unwrap();
    client
        .sell(&alice, unlisted.id, Decimal::from(100))
        .await
        .unwrap();
    client.add_to_cart(&bob, unlisted.id, Some(1)).await.unwrap();
    let order = client.create_order(&bob, &cash_on_delivery()).await.unwrap();
    assert_eq!(order.total, order.subtotal + order.shipping_cost + order.tax);

    // Re-pricing the artwork leaves the order alone
    client
        .sell(&alice, unlisted.id, Decimal::from(5000))
        .await
        .unwrap();
    let reread = client.order(&bob, order.id).await.unwrap();
    assert_eq!(reread.total, order.total);
    assert_eq!(reread.items[0].unit_price, Decimal::from(100));
}

#[tokio::test]
async fn test_checkout_validation() {
    let server = TestServer::spawn().await;
    let client = &server.client;
    let (bob, _) = server.signup("bob").await;

    let err = client
        .create_order(&bob, &cash_on_delivery())
        .await
        .unwrap_err();
    assert!(err.is_status(400), "empty cart: {err}");

    let (alice, _) = server.signup("alice").await;
    let work = client
        .create_artwork(&alice, &artwork("Omo", Some(60)))
        .await
        .unwrap();
    client.add_to_cart(&bob, work.id, None).await.unwrap();

    let mut request = cash_on_delivery();
    request.shipping_address.city = "  ".to_owned();
    let err = client.create_order(&bob, &request).await.unwrap_err();
    assert!(err.is_status(400), "blank city: {err}");

    // Cart survives a rejected checkout
    assert_eq!(client.cart(&bob).await.unwrap().total_items, 1);
}

#[tokio::test]
async fn test_cancellation_window() {
    let server = TestServer::spawn().await;
    let client = &server.client;
    let (alice, _) = server.signup("alice").await;
    let (bob, _) = server.signup("bob").await;
    let (admin, _) = server.signup_admin("admin").await;
    let work = client
        .create_artwork(&alice, &artwork("Sof Omar", Some(80)))
        .await
        .unwrap();

    let mut orders = Vec::new();
    for _ in 0..2 {
        client.add_to_cart(&bob, work.id, None).await.unwrap();
        orders.push(client.create_order(&bob, &cash_on_delivery()).await.unwrap());
    }

    // processing is still cancellable
    client
        .update_order_status(&admin, orders[0].id, "processing")
        .await
        .unwrap();
    client.cancel_order(&bob, orders[0].id).await.unwrap();

    // delivered is not
    client
        .update_order_status(&admin, orders[1].id, "delivered")
        .await
        .unwrap();
    let err = client.cancel_order(&bob, orders[1].id).await.unwrap_err();
    assert!(err.is_status(409));
    let err = client
        .update_order_status(&admin, orders[1].id, "cancelled")
        .await
        .unwrap_err();
    assert!(err.is_status(409));
}

#[tokio::test]
async fn test_no_self_purchase() {
    let server = TestServer::spawn().await;
    let client = &server.client;
    let (alice, _) = server.signup("alice").await;
    let work = client
        .create_artwork(&alice, &artwork("Selfie", Some(10)))
        .await
        .unwrap();

    let err = client.buy(&alice, work.id).await.unwrap_err();
    assert!(err.is_status(403));
}

#[tokio::test]
async fn test_orders_are_private() {
    let server = TestServer::spawn().await;
    let client = &server.client;
    let (alice, _) = server.signup("alice").await;
    let (bob, _) = server.signup("bob").await;
    let (eve, _) = server.signup("eve").await;
    let (admin, _) = server.signup_admin("admin").await;
    let work = client
        .create_artwork(&alice, &artwork("Rift", Some(30)))
        .await
        .unwrap();
    client.add_to_cart(&bob, work.id, None).await.unwrap();
    let order = client.create_order(&bob, &cash_on_delivery()).await.unwrap();

    assert!(client.order(&eve, order.id).await.unwrap_err().is_status(403));
    assert!(client.cancel_order(&eve, order.id).await.unwrap_err().is_status(403));
    assert!(client.order(&admin, order.id).await.is_ok());
    assert!(client.order(&bob, OrderId::new(777)).await.unwrap_err().is_status(404));
    assert!(client.orders(&eve).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_only_artist_edits_and_admin_may_delete() {
    let server = TestServer::spawn().await;
    let client = &server.client;
    let (alice, _) = server.signup("alice").await;
    let (bob, _) = server.signup("bob").await;
    let (admin, _) = server.signup_admin("admin").await;
    let work = client
        .create_artwork(&alice, &artwork("Draft", None))
        .await
        .unwrap();

    let change = UpdateArtworkRequest {
        title: Some("Final".to_owned()),
        ..UpdateArtworkRequest::default()
    };
    assert!(client.update_artwork(&bob, work.id, &change).await.unwrap_err().is_status(403));
    let updated = client.update_artwork(&alice, work.id, &change).await.unwrap();
    assert_eq!(updated.title, "Final");

    assert!(client.delete_artwork(&bob, work.id).await.unwrap_err().is_status(403));
    client.delete_artwork(&admin, work.id).await.unwrap();
    assert!(client.artwork(work.id).await.unwrap_err().is_status(404));
}
