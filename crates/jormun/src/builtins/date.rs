//! The `Date` constructor and prototype, on `chrono`. Rendering is
//! locale-free and fixed to UTC.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

use super::arg;
use crate::{
    error::RunResult,
    heap::HeapData,
    machine::Interp,
    object::{JsObject, ObjectKind},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DateFn {
    Ctor,
    Now,
    Parse,
    GetTime,
    ValueOf,
    GetFullYear,
    GetMonth,
    GetDate,
    GetDay,
    GetHours,
    GetMinutes,
    GetSeconds,
    GetMilliseconds,
    ToISOString,
    ToStringMethod,
    ToJSON,
}

fn this_date(interp: &mut Interp, this: Value) -> RunResult<f64> {
    if let Some(id) = this.object_id(&interp.heap)
        && let ObjectKind::Date(ms) = interp.heap.obj(id).kind
    {
        return Ok(ms);
    }
    Err(interp.throw_type("Date.prototype method called on incompatible receiver"))
}

fn datetime(ms: f64) -> Option<DateTime<Utc>> {
    if !ms.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt(ms as i64).single()
}

pub(crate) fn construct(interp: &mut Interp, args: &[Value]) -> RunResult<Value> {
    let ms = match args.len() {
        0 => interp.timers.now,
        1 => {
            let a0 = arg(args, 0);
            if let Some(s) = a0.as_str(&interp.heap, &interp.interns) {
                parse_date(s)
            } else {
                interp.to_number(a0)?
            }
        }
        _ => {
            let year = interp.to_number(arg(args, 0))?;
            let month = interp.to_number(arg(args, 1))?;
            let day = if args.len() > 2 { interp.to_number(arg(args, 2))? } else { 1.0 };
            let hour = if args.len() > 3 { interp.to_number(arg(args, 3))? } else { 0.0 };
            let minute = if args.len() > 4 { interp.to_number(arg(args, 4))? } else { 0.0 };
            let second = if args.len() > 5 { interp.to_number(arg(args, 5))? } else { 0.0 };
            let milli = if args.len() > 6 { interp.to_number(arg(args, 6))? } else { 0.0 };
            match Utc
                .with_ymd_and_hms(year as i32, month as u32 + 1, day as u32, hour as u32, minute as u32, second as u32)
                .single()
            {
                Some(dt) => dt.timestamp_millis() as f64 + milli,
                None => f64::NAN,
            }
        }
    };
    let obj = JsObject::new(Some(interp.realm.date_proto), ObjectKind::Date(ms));
    Ok(Value::Ref(interp.heap.alloc(HeapData::Object(obj))?))
}

fn parse_date(s: &str) -> f64 {
    // ISO-8601 (the interchange format) is the only supported input
    match DateTime::parse_from_rfc3339(s) {
        Ok(dt) => dt.timestamp_millis() as f64,
        Err(_) => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(|d| {
                d.and_hms_opt(0, 0, 0)
                    .map(|ndt| ndt.and_utc().timestamp_millis() as f64)
                    .unwrap_or(f64::NAN)
            })
            .unwrap_or(f64::NAN),
    }
}

pub(crate) fn call(interp: &mut Interp, f: DateFn, this: Value, args: &[Value]) -> RunResult<Value> {
    match f {
        DateFn::Ctor => {
            // Date() without new returns the current time string
            let ms = interp.timers.now;
            Value::string(&mut interp.heap, render_date(ms))
        }
        DateFn::Now => Ok(Value::Number(interp.timers.now)),
        DateFn::Parse => {
            let s = interp.to_string_rust(arg(args, 0))?;
            Ok(Value::Number(parse_date(&s)))
        }
        DateFn::GetTime | DateFn::ValueOf => Ok(Value::Number(this_date(interp, this)?)),
        DateFn::GetFullYear => date_part(interp, this, |dt| f64::from(dt.year())),
        DateFn::GetMonth => date_part(interp, this, |dt| f64::from(dt.month0())),
        DateFn::GetDate => date_part(interp, this, |dt| f64::from(dt.day())),
        DateFn::GetDay => date_part(interp, this, |dt| f64::from(dt.weekday().num_days_from_sunday())),
        DateFn::GetHours => date_part(interp, this, |dt| f64::from(dt.hour())),
        DateFn::GetMinutes => date_part(interp, this, |dt| f64::from(dt.minute())),
        DateFn::GetSeconds => date_part(interp, this, |dt| f64::from(dt.second())),
        DateFn::GetMilliseconds => date_part(interp, this, |dt| f64::from(dt.timestamp_subsec_millis())),
        DateFn::ToISOString => {
            let ms = this_date(interp, this)?;
            let Some(dt) = datetime(ms) else {
                return Err(crate::error::RunError::range_err("Invalid time value"));
            };
            let s = dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
            Value::string(&mut interp.heap, s)
        }
        DateFn::ToStringMethod => {
            let ms = this_date(interp, this)?;
            Value::string(&mut interp.heap, render_date(ms))
        }
        DateFn::ToJSON => {
            let ms = this_date(interp, this)?;
            if !ms.is_finite() {
                return Ok(Value::Null);
            }
            call(interp, DateFn::ToISOString, this, args)
        }
    }
}

fn date_part(interp: &mut Interp, this: Value, f: fn(&DateTime<Utc>) -> f64) -> RunResult<Value> {
    let ms = this_date(interp, this)?;
    Ok(Value::Number(match datetime(ms) {
        Some(dt) => f(&dt),
        None => f64::NAN,
    }))
}

/// The fixed `toString` rendering (UTC, locale-free):
/// `Sat Aug 01 2026 12:00:00 GMT+0000`.
fn render_date(ms: f64) -> String {
    match datetime(ms) {
        None => "Invalid Date".to_owned(),
        Some(dt) => dt.format("%a %b %d %Y %H:%M:%S GMT+0000").to_string(),
    }
}
