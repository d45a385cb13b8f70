use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Days, Local, NaiveDateTime, TimeZone};

use crate::model::config::{InstanceSettings, DEFAULT_SCHEDULED_TIMES};

/// `HH:MM,HH:MM` into sorted, unique `(hour, minute)` pairs. Malformed or
/// out-of-range tokens are dropped.
pub fn parse_scheduled_times(raw: &str) -> Vec<(u32, u32)> {
    let mut out: Vec<(u32, u32)> = raw.split(',').filter_map(parse_time).collect();
    out.sort_unstable();
    out.dedup();
    out
}

fn parse_time(token: &str) -> Option<(u32, u32)> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    let (hour, minute) = token.split_once(':')?;
    let hour: u32 = hour.trim().parse().ok()?;
    let minute: u32 = minute.trim().parse().ok()?;
    (hour <= 23 && minute <= 59).then_some((hour, minute))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    Interval(Duration),
    /// Local wall-clock times, sorted.
    Daily(Vec<(u32, u32)>),
}

impl Schedule {
    pub fn from_settings(settings: &InstanceSettings) -> Self {
        if !settings.use_scheduled_refresh {
            return Schedule::Interval(Duration::from_secs(settings.update_interval));
        }

        let mut times = parse_scheduled_times(&settings.scheduled_times);
        if times.is_empty() {
            times = parse_scheduled_times(DEFAULT_SCHEDULED_TIMES);
        }
        Schedule::Daily(times)
    }

    pub fn describe(&self) -> String {
        match self {
            Schedule::Interval(every) => format!("every {}s", every.as_secs()),
            Schedule::Daily(times) => times
                .iter()
                .map(|(h, m)| format!("{h:02}:{m:02}"))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Time to wait from `now` until the next refresh.
    pub fn next_delay(&self, now: DateTime<Local>) -> Duration {
        match self {
            Schedule::Interval(every) => *every,
            Schedule::Daily(times) => next_fire(now.naive_local(), times)
                .and_then(|fire| Local.from_local_datetime(&fire).earliest())
                .and_then(|fire| (fire - now).to_std().ok())
                .unwrap_or(Duration::from_secs(60)),
        }
    }
}

/// First listed time strictly after `now`, today or on a following day.
/// Times that fall in a DST gap are skipped.
pub fn next_fire(now: NaiveDateTime, times: &[(u32, u32)]) -> Option<NaiveDateTime> {
    (0..=2u64).find_map(|offset| {
        let day = now.date().checked_add_days(Days::new(offset))?;
        times.iter().find_map(|&(h, m)| {
            let at = day.and_hms_opt(h, m, 0)?;
            let resolvable = Local.from_local_datetime(&at).earliest().is_some();
            (at > now && resolvable).then_some(at)
        })
    })
}

/// Sleep until each fire time and run `tick`. Never returns; abort the task
/// to stop it.
pub async fn run<F, Fut>(schedule: Schedule, mut tick: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        let delay = schedule.next_delay(Local::now());
        tracing::debug!(delay_secs = delay.as_secs(), "next scheduled refresh");
        tokio::time::sleep(delay).await;
        tick().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn parses_dedups_and_drops_out_of_range() {
        assert_eq!(parse_scheduled_times("08:00,25:99,08:00"), vec![(8, 0)]);
        assert_eq!(
            parse_scheduled_times(" 20:30 , 7:05,,x, 12:60, 8:00:00"),
            vec![(7, 5), (20, 30)]
        );
        assert!(parse_scheduled_times("").is_empty());
    }

    #[test]
    fn empty_list_falls_back_to_default() {
        let settings = InstanceSettings {
            scheduled_times: "nonsense".into(),
            ..Default::default()
        };
        assert_eq!(
            Schedule::from_settings(&settings),
            Schedule::Daily(vec![(0, 0), (8, 0)])
        );
    }

    #[test]
    fn interval_mode_ignores_times() {
        let settings = InstanceSettings {
            use_scheduled_refresh: false,
            update_interval: 900,
            ..Default::default()
        };
        let schedule = Schedule::from_settings(&settings);
        assert_eq!(schedule, Schedule::Interval(Duration::from_secs(900)));
        assert_eq!(schedule.next_delay(Local::now()), Duration::from_secs(900));
    }

    #[test]
    fn next_fire_is_strictly_after_now() {
        let times = [(0, 0), (8, 0)];
        assert_eq!(next_fire(at(7, 59, 59), &times), Some(at(8, 0, 0)));
        assert_eq!(
            next_fire(at(8, 0, 0), &times),
            Some(at(0, 0, 0) + chrono::Duration::days(1))
        );
        assert_eq!(next_fire(at(0, 0, 0), &times), Some(at(8, 0, 0)));
        assert_eq!(next_fire(at(8, 0, 0), &[]), None);
    }

    #[test]
    fn describe_lists_times() {
        assert_eq!(Schedule::Daily(vec![(0, 0), (8, 5)]).describe(), "00:00, 08:05");
    }
}
