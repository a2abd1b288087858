use chrono::Utc;
use common::{Money, ProductId, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{CheckoutSettings, NewProduct, OrderAssembler, ReservedLine, Shop};
use shop_store::InMemoryStore;

fn reserved_lines(count: usize) -> Vec<ReservedLine> {
    (0..count)
        .map(|i| ReservedLine {
            product_id: ProductId::new(),
            product_name: format!("Product {i}"),
            quantity: 2,
            unit_price: Money::from_cents(100 * (i as i64 + 1)),
        })
        .collect()
}

fn bench_assemble_order(c: &mut Criterion) {
    let assembler = OrderAssembler;
    let user_id = UserId::new();
    let lines = reserved_lines(50);

    c.bench_function("domain/assemble_50_lines", |b| {
        b.iter(|| {
            assembler
                .assemble(user_id, lines.clone(), Utc::now())
                .unwrap()
        });
    });
}

fn bench_add_to_cart(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let shop = Shop::new(InMemoryStore::new(), CheckoutSettings::default());
    let product_id = rt.block_on(async {
        shop.catalog()
            .register_product(NewProduct::new(
                "SKU-BENCH",
                "Benchmark Widget",
                Money::from_cents(1000),
                u32::MAX,
            ))
            .await
            .unwrap()
            .id
    });

    c.bench_function("domain/add_to_cart", |b| {
        b.iter(|| {
            rt.block_on(async {
                shop.add_to_cart(UserId::new(), product_id, 1).await.unwrap();
            });
        });
    });
}

fn bench_checkout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let shop = Shop::new(InMemoryStore::new(), CheckoutSettings::default());
    let products: Vec<ProductId> = rt.block_on(async {
        let mut ids = Vec::new();
        for i in 0..5 {
            let product = shop
                .catalog()
                .register_product(NewProduct::new(
                    format!("SKU-{i:03}"),
                    format!("Product {i}"),
                    Money::from_cents(100 * (i + 1)),
                    u32::MAX,
                ))
                .await
                .unwrap();
            ids.push(product.id);
        }
        ids
    });

    c.bench_function("domain/checkout_5_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                let user_id = UserId::new();
                for product_id in &products {
                    shop.add_to_cart(user_id, *product_id, 1).await.unwrap();
                }
                shop.checkout(user_id).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_assemble_order,
    bench_add_to_cart,
    bench_checkout,
);
criterion_main!(benches);
