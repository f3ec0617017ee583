use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ulid::Ulid;

use crate::config::RadarConfig;
use crate::events::{EventBus, RadarEvent};
use crate::store::{ClonePatch, CommitReceipt, RadarStore, ScanCommit, StoreError};

mod cooldown;
mod pool;
mod reconciler;
mod scorer;
mod selection;

pub use cooldown::{format_countdown, Cooldown, ScanStatus, DEFAULT_COOLDOWN_MINUTES};
pub use pool::CandidatePool;
pub use reconciler::plan;
pub use scorer::{score, Score, ScoredCandidate};
pub use selection::{SelectionOrder, SelectionPolicy, DEFAULT_SELECTION_ORDER, DEFAULT_TOP_K};

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
	#[error("user not found: {0}")]
	UnknownUser(Ulid),
	#[error("scan is on cooldown for another {}", format_countdown(*.remaining))]
	OnCooldown {
		remaining: chrono::Duration,
		next_allowed_at: DateTime<Utc>,
	},
	#[error("scan failed: {0}")]
	Failed(#[from] StoreError),
}

impl ScanError {
	/// Whether retrying the same scan later can succeed.
	pub fn is_retryable(&self) -> bool {
		!matches!(self, Self::UnknownUser(_))
	}
}

/// A match found by a scan.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ScanMatch {
	pub user_id: Ulid,
	pub match_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ScanReport {
	pub user_id: Ulid,
	pub scanned_at: DateTime<Utc>,
	pub next_allowed_at: DateTime<Utc>,
	/// Size of the candidate pool that was scored
	pub candidates: usize,
	/// The selected candidates with a non zero score, in selection order
	pub matches: Vec<ScanMatch>,
	pub receipt: CommitReceipt,
}

/// Runs `work` and waits at least `floor` from the moment it is called. The
/// floor is slept concurrently, so the total is the longer of the two.
pub async fn with_floor<F: Future>(floor: Duration, work: F) -> F::Output {
	if floor.is_zero() {
		return work.await;
	}

	let (output, ()) = tokio::join!(work, tokio::time::sleep(floor));
	output
}

/// The clone matching engine: candidate pool, scoring, selection and
/// reconciliation behind a per user cooldown.
#[derive(Clone)]
pub struct Engine {
	store: Arc<dyn RadarStore>,
	events: EventBus,
	cooldown: Cooldown,
	policy: SelectionPolicy,
	scan_floor: Duration,
}

impl Engine {
	pub fn new(store: Arc<dyn RadarStore>, events: EventBus, config: &RadarConfig) -> Self {
		Self {
			store,
			events,
			cooldown: Cooldown::from_minutes(config.cooldown_minutes),
			policy: SelectionPolicy {
				order: config.selection,
				top_k: config.top_k,
				retire_decayed: config.retire_decayed,
			},
			scan_floor: config.scan_floor,
		}
	}

	pub async fn scan_status(&self, user_id: Ulid, now: DateTime<Utc>) -> Result<ScanStatus, ScanError> {
		let user = self.store.user(user_id).await?.ok_or(ScanError::UnknownUser(user_id))?;
		Ok(self.cooldown.status(user.last_scan_at, now))
	}

	pub async fn scan(&self, user_id: Ulid) -> Result<ScanReport, ScanError> {
		self.scan_at(user_id, Utc::now()).await
	}

	/// Scans for clones of `user_id` as of `now`.
	///
	/// A user on cooldown is rejected before any work is done. Otherwise the
	/// scan takes at least the configured floor, and either every clone
	/// mutation is committed or none is.
	#[tracing::instrument(skip_all, fields(user_id = %user_id))]
	pub async fn scan_at(&self, user_id: Ulid, now: DateTime<Utc>) -> Result<ScanReport, ScanError> {
		let user = self.store.user(user_id).await?.ok_or(ScanError::UnknownUser(user_id))?;

		let status = self.cooldown.status(user.last_scan_at, now);
		if let Some(next_allowed_at) = status.next_allowed_at.filter(|_| !status.can_scan) {
			tracing::info!(remaining = status.remaining.num_seconds(), "scan rejected, on cooldown");
			return Err(ScanError::OnCooldown {
				remaining: status.remaining,
				next_allowed_at,
			});
		}

		let result = with_floor(self.scan_floor, self.run_scan(user_id, user.last_scan_at, now)).await;

		match result {
			Err(StoreError::ScanConflict(_)) => Err(self.conflict_error(user_id, now).await),
			Err(err) => {
				tracing::error!(error = %err, "scan failed");
				Err(ScanError::Failed(err))
			}
			Ok(report) => Ok(report),
		}
	}

	async fn run_scan(
		&self,
		user_id: Ulid,
		last_scan_at: Option<DateTime<Utc>>,
		now: DateTime<Utc>,
	) -> Result<ScanReport, StoreError> {
		let store = self.store.as_ref();

		let channels = store.list_channels(user_id).await?;
		let pool = CandidatePool::gather(store, user_id, &channels).await?;

		tracing::debug!(channels = channels.len(), candidates = pool.len(), "scoring candidate pool");

		let mut sets = store.channel_sets(&pool.to_vec()).await?;
		let scored = pool
			.iter()
			.map(|candidate| ScoredCandidate {
				user_id: *candidate,
				score: score(&channels, &sets.remove(candidate).unwrap_or_default()),
				previously_matched: pool.is_partner(candidate),
			})
			.collect();

		let selected = self.policy.select(scored);
		let patches = plan(user_id, &selected);

		let receipt = store
			.commit_scan(&ScanCommit {
				user_id,
				scanned_at: now,
				expected_last_scan: last_scan_at,
				patches: patches.clone(),
			})
			.await?;

		tracing::info!(
			candidates = pool.len(),
			inserted = receipt.inserted,
			updated = receipt.updated,
			deleted = receipt.deleted,
			"scan committed"
		);

		self.publish(user_id, &patches, &receipt);

		Ok(ScanReport {
			user_id,
			scanned_at: now,
			next_allowed_at: now + self.cooldown.window(),
			candidates: pool.len(),
			matches: selected
				.iter()
				.filter(|c| !c.score.is_zero())
				.map(|c| ScanMatch {
					user_id: c.user_id,
					match_count: c.score.count(),
				})
				.collect(),
			receipt,
		})
	}

	/// Another scan of the same user committed first. Report the cooldown it
	/// started, or fail if there is somehow none.
	async fn conflict_error(&self, user_id: Ulid, now: DateTime<Utc>) -> ScanError {
		match self.scan_status(user_id, now).await {
			Ok(ScanStatus {
				can_scan: false,
				remaining,
				next_allowed_at: Some(next_allowed_at),
				..
			}) => ScanError::OnCooldown {
				remaining,
				next_allowed_at,
			},
			Ok(_) => ScanError::Failed(StoreError::ScanConflict(user_id)),
			Err(err) => err,
		}
	}

	fn publish(&self, user_id: Ulid, patches: &[ClonePatch], receipt: &CommitReceipt) {
		if receipt.mutations() == 0 {
			return;
		}

		self.events.publish(RadarEvent::ClonesChanged { user_id });
		for patch in patches {
			if let Some((a, b)) = patch.key().participants() {
				let other = if a == user_id { b } else { a };
				self.events.publish(RadarEvent::ClonesChanged { user_id: other });
			}
		}
		self.events.publish(RadarEvent::RecentScansChanged);
	}
}
