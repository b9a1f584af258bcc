mod common;

use anyhow::Result;
use common::{add, names, parse_date, test_service};
use spendbook::application::{AppError, ExpenseFilter, ExpenseService};
use chrono::{TimeZone, Utc};
use spendbook::domain::{Expense, ExpenseUpdate};
use uuid::Uuid;

#[tokio::test]
async fn test_new_database_is_empty() -> Result<()> {
    let (service, _temp) = test_service().await?;

    assert!(service.list().await?.is_empty());
    assert!(service.is_empty().await?);
    assert_eq!(service.count().await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_list_is_sorted_by_date_descending() -> Result<()> {
    let (service, _temp) = test_service().await?;

    add(&service, "Groceries", "2024-03-10", 5420).await?;
    add(&service, "Rent", "2024-03-01", 120000).await?;
    add(&service, "Cinema", "2024-03-15", 1800).await?;
    add(&service, "Bus pass", "2024-02-28", 4900).await?;

    let expenses = service.list().await?;
    assert_eq!(
        names(&expenses),
        vec!["Cinema", "Groceries", "Rent", "Bus pass"]
    );
    assert!(expenses.windows(2).all(|w| w[0].date >= w[1].date));

    Ok(())
}

#[tokio::test]
async fn test_equal_dates_keep_insertion_order() -> Result<()> {
    let (service, _temp) = test_service().await?;

    add(&service, "Breakfast", "2024-04-02", 900).await?;
    add(&service, "Lunch", "2024-04-02", 1450).await?;
    add(&service, "Older", "2024-04-01", 100).await?;
    add(&service, "Dinner", "2024-04-02", 3200).await?;

    let expenses = service.list().await?;
    assert_eq!(
        names(&expenses),
        vec!["Breakfast", "Lunch", "Dinner", "Older"]
    );

    Ok(())
}

#[tokio::test]
async fn test_insert_without_value_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;

    add(&service, "Coffee", "2024-01-01", 450).await?;

    let result = service
        .insert("Mystery", parse_date("2024-01-02"), None)
        .await?;
    assert!(result.is_none());

    let result = service.insert("", parse_date("2024-01-03"), None).await?;
    assert!(result.is_none());

    assert_eq!(service.list().await?.len(), 1);
    assert_eq!(service.count().await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_inserted_expense_is_visible_immediately() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let inserted = add(&service, "Coffee", "2024-01-01", 450).await?;

    let listed = service.list().await?;
    assert_eq!(listed, vec![inserted.clone()]);
    assert_eq!(service.get(inserted.id).await?, inserted);

    Ok(())
}

#[tokio::test]
async fn test_insert_assigns_fresh_ids_and_sequences() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let a = add(&service, "Coffee", "2024-01-01", 450).await?;
    let b = add(&service, "Coffee", "2024-01-01", 450).await?;

    assert_ne!(a.id, b.id);
    assert!(b.sequence > a.sequence);
    assert_eq!(service.list().await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_update_changes_only_named_field() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let coffee = add(&service, "Coffee", "2024-01-01", 450).await?;
    let rent = add(&service, "Rent", "2024-01-05", 120000).await?;

    let updated = service
        .update(coffee.id, ExpenseUpdate::default().name("Espresso"))
        .await?;
    assert_eq!(updated.name, "Espresso");

    let stored = service.get(coffee.id).await?;
    assert_eq!(stored.name, "Espresso");
    assert_eq!(stored.id, coffee.id);
    assert_eq!(stored.date, coffee.date);
    assert_eq!(stored.value, coffee.value);
    assert_eq!(stored.sequence, coffee.sequence);
    assert_eq!(stored.created_at, coffee.created_at);

    assert_eq!(service.get(rent.id).await?, rent);

    Ok(())
}

#[tokio::test]
async fn test_update_date_reorders_listing() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let coffee = add(&service, "Coffee", "2024-01-01", 450).await?;
    add(&service, "Rent", "2024-01-05", 120000).await?;

    service
        .update(coffee.id, ExpenseUpdate::default().date(parse_date("2024-01-09")))
        .await?;

    assert_eq!(names(&service.list().await?), vec!["Coffee", "Rent"]);

    Ok(())
}

#[tokio::test]
async fn test_update_unknown_id_is_not_found() -> Result<()> {
    let (service, _temp) = test_service().await?;
    add(&service, "Coffee", "2024-01-01", 450).await?;

    let missing = Uuid::new_v4();
    let result = service
        .update(missing, ExpenseUpdate::default().value(100))
        .await;

    assert!(matches!(result, Err(AppError::ExpenseNotFound(id)) if id == missing));
    assert_eq!(service.list().await?[0].value, 450);

    Ok(())
}

#[tokio::test]
async fn test_delete_removes_exactly_that_expense() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let coffee = add(&service, "Coffee", "2024-01-01", 450).await?;
    let rent = add(&service, "Rent", "2024-01-05", 120000).await?;
    let books = add(&service, "Books", "2024-01-03", 3999).await?;

    let removed = service.delete(&[rent.id]).await?;
    assert_eq!(removed, 1);

    let expenses = service.list().await?;
    assert_eq!(expenses.len(), 2);
    assert!(expenses.iter().all(|e| e.id != rent.id));
    assert_eq!(expenses, vec![books, coffee]);

    Ok(())
}

#[tokio::test]
async fn test_delete_ignores_unknown_and_repeated_ids() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let coffee = add(&service, "Coffee", "2024-01-01", 450).await?;

    assert_eq!(service.delete(&[Uuid::new_v4()]).await?, 0);
    assert_eq!(service.delete(&[]).await?, 0);
    assert_eq!(service.count().await?, 1);

    assert_eq!(service.delete(&[coffee.id, coffee.id]).await?, 1);
    assert!(matches!(
        service.get(coffee.id).await,
        Err(AppError::ExpenseNotFound(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_delete_all_reaches_empty_state() -> Result<()> {
    let (service, _temp) = test_service().await?;

    add(&service, "Coffee", "2024-01-01", 450).await?;
    add(&service, "Rent", "2024-01-05", 120000).await?;

    let ids: Vec<_> = service.list().await?.iter().map(|e| e.id).collect();
    assert_eq!(service.delete(&ids).await?, 2);

    assert!(service.list().await?.is_empty());
    assert!(service.is_empty().await?);

    Ok(())
}

#[tokio::test]
async fn test_coffee_and_rent_walkthrough() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let coffee = add(&service, "Coffee", "2024-05-01", 450).await?;
    let rent = add(&service, "Rent", "2024-05-02", 120000).await?;
    assert_eq!(names(&service.list().await?), vec!["Rent", "Coffee"]);

    service
        .update(coffee.id, ExpenseUpdate::default().value(500))
        .await?;
    let expenses = service.list().await?;
    assert_eq!(names(&expenses), vec!["Rent", "Coffee"]);
    assert_eq!(expenses[1].value, 500);

    service.delete(&[rent.id]).await?;
    let expenses = service.list().await?;
    assert_eq!(names(&expenses), vec!["Coffee"]);
    assert_eq!(expenses[0].value, 500);

    Ok(())
}

#[tokio::test]
async fn test_data_survives_reconnect() -> Result<()> {
    let (service, temp) = test_service().await?;
    let coffee = add(&service, "Coffee", "2024-01-01", 450).await?;
    drop(service);

    let db_path = temp.path().join("test.db");
    let reopened = ExpenseService::connect(db_path.to_str().unwrap()).await?;
    assert_eq!(reopened.list().await?, vec![coffee]);

    Ok(())
}

#[tokio::test]
async fn test_init_is_idempotent() -> Result<()> {
    let (service, temp) = test_service().await?;
    add(&service, "Coffee", "2024-01-01", 450).await?;
    drop(service);

    let db_path = temp.path().join("test.db");
    let again = ExpenseService::init(db_path.to_str().unwrap()).await?;
    assert_eq!(again.count().await?, 1);

    let next = add(&again, "Tea", "2024-01-02", 300).await?;
    assert_eq!(next.sequence, 2);

    Ok(())
}

#[tokio::test]
async fn test_filtered_listing() -> Result<()> {
    let (service, _temp) = test_service().await?;

    add(&service, "Coffee", "2024-01-01", 450).await?;
    add(&service, "Rent", "2024-01-05", 120000).await?;
    add(&service, "Coffee beans", "2024-01-10", 1899).await?;
    add(&service, "100% juice", "2024-01-12", 350).await?;

    let big = ExpenseFilter {
        min_value: Some(100000),
        ..Default::default()
    };
    assert_eq!(names(&service.list_filtered(&big).await?), vec!["Rent"]);

    let coffee = ExpenseFilter {
        name_contains: Some("coffee".into()),
        ..Default::default()
    };
    assert_eq!(
        names(&service.list_filtered(&coffee).await?),
        vec!["Coffee beans", "Coffee"]
    );

    let literal_percent = ExpenseFilter {
        name_contains: Some("0%".into()),
        ..Default::default()
    };
    assert_eq!(
        names(&service.list_filtered(&literal_percent).await?),
        vec!["100% juice"]
    );

    let window = ExpenseFilter {
        from_date: Some(parse_date("2024-01-02")),
        to_date: Some(parse_date("2024-01-10")),
        ..Default::default()
    };
    assert_eq!(
        names(&service.list_filtered(&window).await?),
        vec!["Coffee beans", "Rent"]
    );

    let newest_two = ExpenseFilter {
        limit: Some(2),
        ..Default::default()
    };
    assert_eq!(
        names(&service.list_filtered(&newest_two).await?),
        vec!["100% juice", "Coffee beans"]
    );

    Ok(())
}

#[tokio::test]
async fn test_total() -> Result<()> {
    let (service, _temp) = test_service().await?;

    assert_eq!(service.total(&ExpenseFilter::default()).await?, 0);

    add(&service, "Coffee", "2024-01-01", 450).await?;
    add(&service, "Rent", "2024-01-05", 120000).await?;

    assert_eq!(service.total(&ExpenseFilter::default()).await?, 120450);

    let small = ExpenseFilter {
        max_value: Some(1000),
        ..Default::default()
    };
    assert_eq!(service.total(&small).await?, 450);

    Ok(())
}

#[tokio::test]
async fn test_dates_outside_four_digit_years_are_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let coffee = add(&service, "Coffee", "2024-01-01", 450).await?;

    let before_year_zero = Utc.with_ymd_and_hms(-1, 1, 1, 0, 0, 0).unwrap();
    let year_ten_thousand = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();

    for date in [before_year_zero, year_ten_thousand] {
        let result = service.insert("Ancient", date, Some(1)).await;
        assert!(matches!(result, Err(AppError::InvalidDate(_))));

        let result = service
            .update(coffee.id, ExpenseUpdate::default().date(date))
            .await;
        assert!(matches!(result, Err(AppError::InvalidDate(_))));
    }

    // Listing still works and agrees with the count
    assert_eq!(service.list().await?, vec![coffee]);
    assert_eq!(service.count().await?, 1);

    let edge = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap();
    service.insert("Far future", edge, Some(1)).await?;
    assert_eq!(names(&service.list().await?), vec!["Far future", "Coffee"]);

    Ok(())
}

#[tokio::test]
async fn test_total_overflow_is_an_error() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let half = i64::MAX / 2 + 1;
    add(&service, "Yacht", "2024-01-01", half).await?;
    add(&service, "Island", "2024-01-02", half).await?;

    let result = service.total(&ExpenseFilter::default()).await;
    assert!(matches!(result, Err(AppError::InvalidAmount(_))));

    let one = ExpenseFilter {
        limit: Some(1),
        ..Default::default()
    };
    assert_eq!(service.total(&one).await?, half);

    Ok(())
}

#[tokio::test]
async fn test_insert_batch_keeps_ids_and_is_all_or_nothing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let existing = add(&service, "Coffee", "2024-01-01", 450).await?;

    let id = Uuid::new_v4();
    let kept = Expense::new("Rent", parse_date("2024-01-05"), 120000).with_id(id);
    let stored = service.insert_batch(vec![kept]).await?;
    assert_eq!(stored[0].id, id);
    assert_eq!(service.get(id).await?.name, "Rent");

    // Second row clashes with an existing primary key: nothing is written
    let fresh = Expense::new("Books", parse_date("2024-01-06"), 3999);
    let clash = Expense::new("Clash", parse_date("2024-01-07"), 1).with_id(existing.id);
    assert!(service.insert_batch(vec![fresh, clash]).await.is_err());
    assert_eq!(names(&service.list().await?), vec!["Rent", "Coffee"]);

    Ok(())
}
