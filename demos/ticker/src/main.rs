//! A price ticker driven by a plain host loop: sleep until the next timer is
//! due, run what is due, repeat. Run with `RUST_LOG=debug` to see the core's
//! own logging.

use std::cell::Cell;

use anyhow::Context;
use weft_core::*;

#[derive(Clone, Debug, PartialEq, Shape)]
struct Quote {
    symbol: String,
    price: u32,
    trades: u32,
}

/// Deterministic price walk so runs are reproducible.
struct Walk(Cell<u64>);

impl Walk {
    fn step(&self) -> i32 {
        let next = self
            .0
            .get()
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0.set(next);
        (next >> 61) as i32 - 3
    }
}

fn cents(v: u32) -> String {
    format!("{}.{:02}", v / 100, v % 100)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let timers = Timers::system();
    let tasks = Tasks::new(&timers);
    let app = Manager::new();

    let quote = app.track(Struct::new(Quote {
        symbol: "WEFT".into(),
        price: 1_000,
        trades: 0,
    }));
    let history = quote.fields().price.history(HistoryOptions { limit: 8 });

    // The display only needs a few refreshes per second.
    let display = app.track(State::computed_with_options(
        {
            let quote = quote.clone();
            move |t| t.get(&quote)
        },
        StateOptions::default().throttle(Duration::from_millis(250), &timers),
    ));
    display.on(|q| log::info!("{} {} ({} trades)", q.symbol, cents(q.price), q.trades));

    let _alerts = app.track(effect(
        &[&quote.fields().price],
        {
            let price = quote.fields().price.clone();
            move || {
                if price.get() < 950 {
                    log::warn!("price below 9.50");
                }
            }
        },
        EffectOptions::default(),
    ));

    let trade = tasks
        .add(
            "trade",
            {
                let quote = quote.clone();
                let walk = Walk(Cell::new(7));
                move || {
                    quote.update(|q| QuotePatch {
                        price: Some(q.price.saturating_add_signed(walk.step())),
                        trades: Some(q.trades + 1),
                        ..Default::default()
                    })
                }
            },
            TaskOptions::every(Duration::from_millis(20)).times(100),
        )
        .context("scheduling trades")?;

    let report = tasks
        .add(
            "report",
            {
                let history = history.clone();
                move || {
                    let recent: Vec<String> =
                        history.entries().iter().map(|e| cents(e.value)).collect();
                    log::debug!("recent prices {recent:?}");
                }
            },
            TaskOptions::every(Duration::from_millis(500)),
        )
        .context("scheduling report")?;

    while let Some(deadline) = timers.next_deadline() {
        let now = timers.now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        timers.run_due();

        if !trade.active().get() && report.active().get() {
            report.dispose();
            log::info!("trading closed");
        }
    }

    let closing = quote.get();
    println!(
        "{} closed at {} after {} trades",
        closing.symbol,
        cents(closing.price),
        closing.trades
    );

    history
        .restore(-1)
        .context("restoring the previous price")?;
    println!("rolled back to {}", cents(quote.get().price));

    tasks.dispose();
    app.dispose();
    Ok(())
}
