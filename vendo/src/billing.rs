//! Subscription billing orchestration.
//!
//! Checkout reserves a pending subscription and a payment transaction;
//! confirmation (client callback or gateway webhook) finalizes both in one
//! database transaction: the payment flips to success, any wallet portion is
//! debited, and the subscription goes active for the plan's duration.
//! Notifications, referral rewards and the contract email run after commit
//! and never undo a confirmed payment.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{
    config::Config,
    db::{
        handlers::{Notifications, Payments, Plans, Referrals, Repository, Subscriptions, Users, Wallet},
        handlers::{payments::PaymentUpdateDBRequest, subscriptions::SubscriptionUpdateDBRequest},
        models::{
            notifications::NotificationCreateDBRequest,
            payments::{PaymentCreateDBRequest, PaymentDBResponse, PaymentStatus},
            subscriptions::{SubscriptionCreateDBRequest, SubscriptionDBResponse, SubscriptionStatus},
            wallet::{WalletTransactionCreateDBRequest, WalletTransactionType},
        },
    },
    email::EmailService,
    errors::Error,
    payment_providers,
    types::{PaymentTransactionId, PlanId, UserId},
};

/// What a checkout produced: a pending (or, for fully wallet-covered
/// checkouts, already active) subscription and its payment transaction.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub subscription: SubscriptionDBResponse,
    pub payment: PaymentDBResponse,
}

/// Start a subscription checkout.
///
/// When `use_wallet` is set, available balance is applied first and only the
/// remainder goes to the payment gateway. A checkout the wallet covers in
/// full skips the gateway entirely and is confirmed synchronously.
#[tracing::instrument(skip(pool, config))]
pub async fn checkout(
    pool: &PgPool,
    config: &Config,
    user_id: UserId,
    plan_id: PlanId,
    use_wallet: bool,
) -> Result<CheckoutOutcome, Error> {
    let mut tx = pool.begin().await.map_err(|e| Error::Database(e.into()))?;

    let plan = Plans::new(&mut tx)
        .get_by_id(plan_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| Error::NotFound {
            resource: "plan".to_string(),
            id: plan_id.to_string(),
        })?;

    if Subscriptions::new(&mut tx).get_active_for_user(user_id).await?.is_some() {
        return Err(Error::Conflict {
            message: "You already have an active subscription".to_string(),
        });
    }

    let wallet_amount = if use_wallet {
        Wallet::new(&mut tx).balance(user_id).await?.min(plan.price)
    } else {
        Decimal::ZERO
    };
    let amount_due = plan.price - wallet_amount;

    let subscription = Subscriptions::new(&mut tx)
        .create(&SubscriptionCreateDBRequest {
            user_id,
            plan_id: plan.id,
        })
        .await?;

    // The gateway order is created after commit so a gateway outage cannot
    // hold a database transaction open; wallet-only checkouts never need one.
    let provider_name = if amount_due.is_zero() {
        "wallet".to_string()
    } else {
        payment_providers::from_config(config)?.name().to_string()
    };

    let payment = Payments::new(&mut tx)
        .create(&PaymentCreateDBRequest {
            user_id,
            plan_id: plan.id,
            subscription_id: subscription.id,
            gateway_order_id: None,
            amount: plan.price,
            wallet_amount,
            provider: provider_name,
        })
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    if amount_due.is_zero() {
        let payment = confirm_payment(pool, config, payment.id).await?;
        let mut conn = pool.acquire().await.map_err(|e| Error::Database(e.into()))?;
        let subscription = Subscriptions::new(&mut conn)
            .get_by_id(subscription.id)
            .await?
            .ok_or_else(|| Error::NotFound {
                resource: "subscription".to_string(),
                id: subscription.id.to_string(),
            })?;
        return Ok(CheckoutOutcome { subscription, payment });
    }

    let provider = payment_providers::from_config(config)?;
    let order = provider.create_order(amount_due, &payment.id.to_string()).await?;

    let mut conn = pool.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let payment = Payments::new(&mut conn)
        .update(
            payment.id,
            &PaymentUpdateDBRequest {
                status: None,
                gateway_order_id: Some(order.gateway_order_id),
            },
        )
        .await?;

    Ok(CheckoutOutcome { subscription, payment })
}

/// Finalize a successful payment.
///
/// Idempotent: confirming an already-successful payment returns it unchanged
/// and repeats no side effect. A payment that already failed cannot be
/// confirmed.
#[tracing::instrument(skip(pool, config))]
pub async fn confirm_payment(
    pool: &PgPool,
    config: &Config,
    payment_id: PaymentTransactionId,
) -> Result<PaymentDBResponse, Error> {
    let mut tx = pool.begin().await.map_err(|e| Error::Database(e.into()))?;

    let payment = Payments::new(&mut tx)
        .get_by_id(payment_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "payment".to_string(),
            id: payment_id.to_string(),
        })?;

    match payment.status {
        PaymentStatus::Success => return Ok(payment),
        PaymentStatus::Failed => {
            return Err(Error::Conflict {
                message: "Payment has already failed".to_string(),
            });
        }
        PaymentStatus::Created => {}
    }

    let payment = Payments::new(&mut tx)
        .update(
            payment.id,
            &PaymentUpdateDBRequest {
                status: Some(PaymentStatus::Success),
                gateway_order_id: None,
            },
        )
        .await?;

    if payment.wallet_amount > Decimal::ZERO {
        Wallet::new(&mut tx)
            .append(&WalletTransactionCreateDBRequest {
                user_id: payment.user_id,
                transaction_type: WalletTransactionType::SubscriptionPayment,
                amount: -payment.wallet_amount,
                description: Some("Subscription payment".to_string()),
                source_id: Some(payment.id.to_string()),
            })
            .await?;
    }

    let plan = Plans::new(&mut tx)
        .get_by_id(payment.plan_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "plan".to_string(),
            id: payment.plan_id.to_string(),
        })?;

    let subscription = Subscriptions::new(&mut tx)
        .update(
            payment.subscription_id,
            &SubscriptionUpdateDBRequest {
                status: Some(SubscriptionStatus::Active),
                current_period_end: Some(Utc::now() + Duration::days(i64::from(plan.duration_days))),
            },
        )
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    // Post-commit side effects must never undo a confirmed payment
    if let Err(error) = post_activation_effects(pool, config, &payment, &subscription, &plan.name).await {
        tracing::warn!(%error, payment_id = %payment.id, "post-activation side effects failed");
    }

    Ok(payment)
}

/// Record a failed gateway payment. A no-op for payments that already
/// reached a terminal status.
#[tracing::instrument(skip(pool))]
pub async fn fail_payment(pool: &PgPool, payment_id: PaymentTransactionId) -> Result<PaymentDBResponse, Error> {
    let mut conn = pool.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let payment = Payments::new(&mut conn)
        .get_by_id(payment_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "payment".to_string(),
            id: payment_id.to_string(),
        })?;

    if payment.status != PaymentStatus::Created {
        return Ok(payment);
    }

    let payment = Payments::new(&mut conn)
        .update(
            payment.id,
            &PaymentUpdateDBRequest {
                status: Some(PaymentStatus::Failed),
                gateway_order_id: None,
            },
        )
        .await?;

    Ok(payment)
}

/// Activation notification, one-shot referral reward, contract email.
async fn post_activation_effects(
    pool: &PgPool,
    config: &Config,
    payment: &PaymentDBResponse,
    subscription: &SubscriptionDBResponse,
    plan_name: &str,
) -> Result<(), Error> {
    let mut conn = pool.acquire().await.map_err(|e| Error::Database(e.into()))?;

    Notifications::new(&mut conn)
        .create(&NotificationCreateDBRequest {
            user_id: payment.user_id,
            kind: "subscription".to_string(),
            title: "Subscription activated".to_string(),
            body: format!("Your {plan_name} subscription is now active"),
        })
        .await?;

    if config.referrals.enabled {
        reward_referrer(&mut conn, config, payment.user_id).await?;
    }

    // Contract email is best effort; a broken mail relay must not fail the flow
    match Users::new(&mut conn).get_by_id(payment.user_id).await? {
        Some(user) => {
            let email = EmailService::new(config)?;
            if let Err(error) = email
                .send_subscription_activated(
                    &user.email,
                    user.display_name.as_deref(),
                    plan_name,
                    subscription.current_period_end,
                )
                .await
            {
                tracing::warn!(%error, user_id = %payment.user_id, "failed to send contract email");
            }
        }
        None => tracing::warn!(user_id = %payment.user_id, "paying user disappeared before contract email"),
    }

    Ok(())
}

/// Reward the referrer the first time their referee activates a
/// subscription. `mark_rewarded` only touches pending referrals, so the
/// reward is paid at most once even under concurrent confirmations.
async fn reward_referrer(conn: &mut sqlx::PgConnection, config: &Config, referee_id: UserId) -> Result<(), Error> {
    let Some(referral) = Referrals::new(conn).get_by_referee(referee_id).await? else {
        return Ok(());
    };

    let Some(rewarded) = Referrals::new(conn)
        .mark_rewarded(referral.id, config.referrals.reward_amount)
        .await?
    else {
        return Ok(());
    };

    Wallet::new(conn)
        .append(&WalletTransactionCreateDBRequest {
            user_id: rewarded.referrer_id,
            transaction_type: WalletTransactionType::ReferralReward,
            amount: config.referrals.reward_amount,
            description: Some("Referral reward".to_string()),
            source_id: Some(rewarded.id.to_string()),
        })
        .await?;

    Notifications::new(conn)
        .create(&NotificationCreateDBRequest {
            user_id: rewarded.referrer_id,
            kind: "referral".to_string(),
            title: "Referral reward earned".to_string(),
            body: format!("You earned {} for a successful referral", config.referrals.reward_amount),
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::referrals::{ReferralCreateDBRequest, ReferralStatus};
    use crate::test_utils::{create_test_config, create_test_plan, create_test_reseller};
    use sqlx::PgPool;

    async fn seed_wallet(pool: &PgPool, user_id: UserId, amount: Decimal) {
        let mut conn = pool.acquire().await.unwrap();
        Wallet::new(&mut conn)
            .append(&WalletTransactionCreateDBRequest {
                user_id,
                transaction_type: WalletTransactionType::AdminGrant,
                amount,
                description: None,
                source_id: None,
            })
            .await
            .unwrap();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_wallet_covered_checkout_activates_synchronously(pool: PgPool) {
        let config = create_test_config();
        let mut conn = pool.acquire().await.unwrap();
        let user = create_test_reseller(&mut conn, "fullwallet").await;
        let plan = create_test_plan(&mut conn, "starter").await;
        drop(conn);

        seed_wallet(&pool, user.id, plan.price * Decimal::from(2)).await;

        let outcome = checkout(&pool, &config, user.id, plan.id, true).await.unwrap();

        assert_eq!(outcome.subscription.status, SubscriptionStatus::Active);
        assert!(outcome.subscription.current_period_end.is_some());
        assert_eq!(outcome.payment.status, PaymentStatus::Success);
        assert_eq!(outcome.payment.wallet_amount, plan.price);
        assert!(outcome.payment.gateway_order_id.is_none());

        // Wallet was debited exactly the plan price
        let mut conn = pool.acquire().await.unwrap();
        let balance = Wallet::new(&mut conn).balance(user.id).await.unwrap();
        assert_eq!(balance, plan.price);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_partial_wallet_checkout_stays_pending(pool: PgPool) {
        let config = create_test_config();
        let mut conn = pool.acquire().await.unwrap();
        let user = create_test_reseller(&mut conn, "partwallet").await;
        let plan = create_test_plan(&mut conn, "starter").await;
        drop(conn);

        let half = plan.price / Decimal::from(2);
        seed_wallet(&pool, user.id, half).await;

        let outcome = checkout(&pool, &config, user.id, plan.id, true).await.unwrap();

        assert_eq!(outcome.subscription.status, SubscriptionStatus::Pending);
        assert_eq!(outcome.payment.status, PaymentStatus::Created);
        assert_eq!(outcome.payment.wallet_amount, half);
        assert!(outcome.payment.gateway_order_id.is_some());

        // Wallet is only debited at confirmation time
        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(Wallet::new(&mut conn).balance(user.id).await.unwrap(), half);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_second_active_subscription_rejected(pool: PgPool) {
        let config = create_test_config();
        let mut conn = pool.acquire().await.unwrap();
        let user = create_test_reseller(&mut conn, "twosubs").await;
        let plan = create_test_plan(&mut conn, "starter").await;
        drop(conn);

        seed_wallet(&pool, user.id, plan.price * Decimal::from(3)).await;

        checkout(&pool, &config, user.id, plan.id, true).await.unwrap();
        let err = checkout(&pool, &config, user.id, plan.id, true).await.unwrap_err();

        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_confirm_is_idempotent(pool: PgPool) {
        let config = create_test_config();
        let mut conn = pool.acquire().await.unwrap();
        let user = create_test_reseller(&mut conn, "idem").await;
        let plan = create_test_plan(&mut conn, "starter").await;
        drop(conn);

        let outcome = checkout(&pool, &config, user.id, plan.id, false).await.unwrap();

        let first = confirm_payment(&pool, &config, outcome.payment.id).await.unwrap();
        assert_eq!(first.status, PaymentStatus::Success);

        let replay = confirm_payment(&pool, &config, outcome.payment.id).await.unwrap();
        assert_eq!(replay.status, PaymentStatus::Success);
        assert_eq!(replay.updated_at, first.updated_at);

        // Activation notification was created exactly once
        let mut conn = pool.acquire().await.unwrap();
        let unread = Notifications::new(&mut conn).unread_count(user.id).await.unwrap();
        assert_eq!(unread, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_referral_rewarded_once_on_first_activation(pool: PgPool) {
        let config = create_test_config();
        let mut conn = pool.acquire().await.unwrap();
        let referrer = create_test_reseller(&mut conn, "referrer").await;
        let referee = create_test_reseller(&mut conn, "referee").await;
        let plan = create_test_plan(&mut conn, "starter").await;
        let referral = Referrals::new(&mut conn)
            .create(&ReferralCreateDBRequest {
                referrer_id: referrer.id,
                referee_id: referee.id,
            })
            .await
            .unwrap();
        drop(conn);

        // First activation pays the reward
        let first = checkout(&pool, &config, referee.id, plan.id, false).await.unwrap();
        confirm_payment(&pool, &config, first.payment.id).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let rewarded = Referrals::new(&mut conn).get_by_id(referral.id).await.unwrap().unwrap();
        assert_eq!(rewarded.status, ReferralStatus::Rewarded);
        let balance = Wallet::new(&mut conn).balance(referrer.id).await.unwrap();
        assert_eq!(balance, config.referrals.reward_amount);

        // Expire and renew: second activation pays nothing more
        Subscriptions::new(&mut conn)
            .update(
                first.subscription.id,
                &SubscriptionUpdateDBRequest {
                    status: Some(SubscriptionStatus::Expired),
                    current_period_end: None,
                },
            )
            .await
            .unwrap();
        drop(conn);

        let second = checkout(&pool, &config, referee.id, plan.id, false).await.unwrap();
        confirm_payment(&pool, &config, second.payment.id).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let balance = Wallet::new(&mut conn).balance(referrer.id).await.unwrap();
        assert_eq!(balance, config.referrals.reward_amount);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_failed_payment_cannot_be_confirmed(pool: PgPool) {
        let config = create_test_config();
        let mut conn = pool.acquire().await.unwrap();
        let user = create_test_reseller(&mut conn, "failuser").await;
        let plan = create_test_plan(&mut conn, "starter").await;
        drop(conn);

        let outcome = checkout(&pool, &config, user.id, plan.id, false).await.unwrap();

        fail_payment(&pool, outcome.payment.id).await.unwrap();
        let err = confirm_payment(&pool, &config, outcome.payment.id).await.unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));

        // Failing again is a no-op
        let still_failed = fail_payment(&pool, outcome.payment.id).await.unwrap();
        assert_eq!(still_failed.status, PaymentStatus::Failed);
    }
}
