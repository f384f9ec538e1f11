/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Canonical structured field value-format helpers.

use crate::message::EventMessage;
use url::Url;

pub const NONE: &str = "none";

pub fn format_optional_url(url: Option<&Url>) -> String {
    url.map(Url::to_string).unwrap_or_else(|| NONE.to_string())
}

pub fn format_event_id(message: &EventMessage) -> String {
    message
        .event_id()
        .map(str::to_string)
        .unwrap_or_else(|| NONE.to_string())
}
