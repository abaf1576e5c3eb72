//! Integration tests for the catalog pipeline.
//!
//! Tests: CatalogService → InMemoryCatalogStore + LocalImageStorage
//!
//! Verifies:
//! - Category references resolve to existing categories or create new ones
//! - Update leaves links alone when categories are omitted and clears on `[]`
//! - Images are written to disk and replaced on update
//! - Purchase never drives stock negative

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use catalog_core::{CategoryId, DomainError, ProductId, SellerId};
    use catalog_products::{CategoryStore, ImageUpload, NewProduct, ProductPatch, SearchQuery};

    use crate::catalog::{CatalogError, CatalogService, UpdateProduct};
    use crate::seed;
    use crate::storage::LocalImageStorage;
    use crate::store::InMemoryCatalogStore;

    struct Harness {
        service: CatalogService,
        store: Arc<InMemoryCatalogStore>,
        dir: TempDir,
    }

    fn setup() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryCatalogStore::new());
        let storage = Arc::new(LocalImageStorage::new(dir.path(), "/storage"));
        let service = CatalogService::new(store.clone(), storage);
        Harness {
            service,
            store,
            dir,
        }
    }

    fn new_product(name: &str, quantity: u32) -> NewProduct {
        NewProduct {
            seller_id: SellerId::new(),
            name: name.to_string(),
            description: format!("{name} for testing"),
            price: Decimal::new(2500, 2),
            quantity,
        }
    }

    fn png(name: &str) -> ImageUpload {
        ImageUpload::new(name, vec![0x89u8, b'P', b'N', b'G'])
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn category_names(details: &catalog_products::ProductDetails) -> Vec<String> {
        details.categories.iter().map(|c| c.name.clone()).collect()
    }

    #[tokio::test]
    async fn create_resolves_names_and_existing_ids() {
        let h = setup();
        let first = h
            .service
            .create_product(new_product("Lamp", 3), strings(&["Lighting"]), vec![png("a.png")])
            .await
            .unwrap();
        let lighting = first.categories[0].id;
        assert_eq!(first.categories[0].product_id, Some(first.product.id));

        let second = h
            .service
            .create_product(
                new_product("Floor lamp", 1),
                vec![lighting.to_string(), "Tall".to_string()],
                vec![png("b.png")],
            )
            .await
            .unwrap();

        assert_eq!(second.categories[0].id, lighting);
        assert_eq!(category_names(&second), vec!["Lighting", "Tall"]);
        assert_eq!(h.service.list_categories(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn create_writes_images_with_thumbnail_first() {
        let h = setup();
        let details = h
            .service
            .create_product(new_product("Lamp", 1), Vec::new(), vec![png("a.png"), png("b.gif")])
            .await
            .unwrap();

        let id = details.product.id;
        assert_eq!(details.images.len(), 2);
        assert!(details.images[0].is_thumbnail);
        assert_eq!(details.images[1].url, format!("/storage/{id}/image_1.gif"));
        assert!(h.dir.path().join(id.to_string()).join("image_0.png").exists());
    }

    #[tokio::test]
    async fn create_without_images_is_rejected_before_any_write() {
        let h = setup();
        let err = h
            .service
            .create_product(new_product("Lamp", 1), strings(&["Lighting"]), Vec::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::Domain(DomainError::Validation(_))));
        assert!(h.service.list_products().await.unwrap().is_empty());
        assert!(h.service.list_categories(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_reconciles_only_when_categories_present() {
        let h = setup();
        let created = h
            .service
            .create_product(new_product("Lamp", 1), strings(&["A", "B"]), vec![png("a.png")])
            .await
            .unwrap();
        let id = created.product.id;
        let a = created.categories[0].id;

        // Attribute-only update keeps links.
        let renamed = h
            .service
            .update_product(
                id,
                UpdateProduct {
                    patch: ProductPatch {
                        name: Some("Brass lamp".to_string()),
                        ..ProductPatch::default()
                    },
                    ..UpdateProduct::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.product.name, "Brass lamp");
        assert_eq!(category_names(&renamed), vec!["A", "B"]);

        // [A, "C"] drops B, keeps A, creates C.
        let reconciled = h
            .service
            .update_product(
                id,
                UpdateProduct {
                    categories: Some(vec![a.to_string(), "C".to_string()]),
                    ..UpdateProduct::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(category_names(&reconciled), vec!["A", "C"]);

        // Empty list clears.
        let cleared = h
            .service
            .update_product(
                id,
                UpdateProduct {
                    categories: Some(Vec::new()),
                    ..UpdateProduct::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.categories.is_empty());
        assert!(h.store.linked_category_ids(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_replaces_images() {
        let h = setup();
        let created = h
            .service
            .create_product(new_product("Lamp", 1), Vec::new(), vec![png("a.png"), png("b.png")])
            .await
            .unwrap();
        let id = created.product.id;

        let updated = h
            .service
            .update_product(
                id,
                UpdateProduct {
                    images: Some(vec![ImageUpload::new("new.jpg", vec![1u8])]),
                    ..UpdateProduct::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.images.len(), 1);
        assert_eq!(updated.images[0].url, format!("/storage/{id}/image_0.jpg"));
        let product_dir = h.dir.path().join(id.to_string());
        assert!(!product_dir.join("image_1.png").exists());
        assert!(product_dir.join("image_0.jpg").exists());
    }

    #[tokio::test]
    async fn update_unknown_product_is_not_found() {
        let h = setup();
        let err = h
            .service
            .update_product(ProductId::new(), UpdateProduct::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound("product")));
    }

    #[tokio::test]
    async fn update_with_duplicate_refs_changes_nothing() {
        let h = setup();
        let created = h
            .service
            .create_product(new_product("Lamp", 1), strings(&["A"]), vec![png("a.png")])
            .await
            .unwrap();

        let err = h
            .service
            .update_product(
                created.product.id,
                UpdateProduct {
                    patch: ProductPatch {
                        quantity: Some(9),
                        ..ProductPatch::default()
                    },
                    categories: Some(strings(&["B", "B"])),
                    images: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::Domain(DomainError::Validation(_))));
        let unchanged = h.service.get_product(created.product.id).await.unwrap();
        assert_eq!(unchanged.product.quantity, 1);
        assert_eq!(category_names(&unchanged), vec!["A"]);
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_removes_files() {
        let h = setup();
        let created = h
            .service
            .create_product(new_product("Lamp", 1), strings(&["A"]), vec![png("a.png")])
            .await
            .unwrap();
        let id = created.product.id;

        h.service.delete_product(id).await.unwrap();
        h.service.delete_product(id).await.unwrap();

        assert!(matches!(
            h.service.get_product(id).await.unwrap_err(),
            CatalogError::NotFound("product")
        ));
        assert!(!h.dir.path().join(id.to_string()).exists());
        // The category survives its originating product.
        assert_eq!(h.service.list_categories(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn purchase_skips_empty_and_unknown_products() {
        let h = setup();
        let stocked = h
            .service
            .create_product(new_product("Lamp", 1), Vec::new(), vec![png("a.png")])
            .await
            .unwrap()
            .product
            .id;
        let empty = h
            .service
            .create_product(new_product("Chair", 0), Vec::new(), vec![png("a.png")])
            .await
            .unwrap()
            .product
            .id;
        let unknown = ProductId::new();

        let outcome = h.service.purchase(vec![stocked, empty, unknown]).await.unwrap();
        assert_eq!(outcome.purchased, vec![stocked]);
        assert_eq!(outcome.out_of_stock, vec![empty, unknown]);

        let again = h.service.purchase(vec![stocked]).await.unwrap();
        assert!(again.purchased.is_empty());
        assert_eq!(h.service.get_product(stocked).await.unwrap().product.quantity, 0);
    }

    #[tokio::test]
    async fn search_requires_a_result_kind() {
        let h = setup();
        let mut query = SearchQuery::new("lamp");
        query.include_products = false;
        query.include_categories = false;

        let err = h.service.search(query).await.unwrap_err();
        assert!(matches!(err, CatalogError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn search_returns_only_requested_kinds() {
        let h = setup();
        h.service
            .create_product(new_product("Desk lamp", 1), strings(&["Lamps"]), vec![png("a.png")])
            .await
            .unwrap();

        let mut query = SearchQuery::new("LAMP");
        query.include_categories = false;
        let results = h.service.search(query).await.unwrap();

        assert_eq!(results.products.map(|p| p.len()), Some(1));
        assert!(results.categories.is_none());
    }

    #[tokio::test]
    async fn category_lifecycle() {
        let h = setup();
        let created = h
            .service
            .create_product(new_product("Lamp", 1), strings(&["Lihgting"]), vec![png("a.png")])
            .await
            .unwrap();
        let category = created.categories[0].id;

        let renamed = h.service.rename_category(category, " Lighting ").await.unwrap();
        assert_eq!(renamed.name, "Lighting");
        assert!(h.service.rename_category(category, "  ").await.is_err());

        let products = h.service.category_products(vec![category]).await.unwrap();
        assert_eq!(products.len(), 1);

        h.service.delete_category(category).await.unwrap();
        assert!(h.service.get_product(created.product.id).await.unwrap().categories.is_empty());
        assert!(matches!(
            h.service.delete_category(category).await.unwrap_err(),
            CatalogError::NotFound("category")
        ));
        assert!(matches!(
            h.service.get_category(CategoryId::new()).await.unwrap_err(),
            CatalogError::NotFound("category")
        ));
    }

    #[tokio::test]
    async fn reset_replaces_everything_with_seed() {
        let h = setup();
        let created = h
            .service
            .create_product(new_product("Lamp", 1), Vec::new(), vec![png("a.png")])
            .await
            .unwrap();

        h.service.reset().await.unwrap();

        assert!(h.service.get_product(created.product.id).await.is_err());
        assert!(!h.dir.path().join(created.product.id.to_string()).exists());
        let products = h.service.list_products().await.unwrap();
        assert_eq!(
            products.iter().map(|d| d.product.id).collect::<Vec<_>>(),
            seed::product_ids()
        );
        assert!(products.iter().all(|d| d.images.len() == 1));

        let sellers = seed::seller_ids();
        assert_eq!(h.service.seller_products(sellers[0]).await.unwrap().len(), 2);
    }
}
