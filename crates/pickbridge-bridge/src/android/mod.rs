// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android entry points via JNI.
//
// The host app registers a `Correlator` with [`install`]. The Java side owns
// the `ActivityResultLauncher`; its callback looks like:
//
//     class DialogCallback implements ActivityResultCallback<Uri> {
//         private final String requestId = beginNative();
//         public void onActivityResult(Uri uri) {
//             onActivityResultNative(requestId, uri);
//         }
//         static native String beginNative();
//         static native void onActivityResultNative(String requestId, Uri uri);
//         static native void invalidateNative(String requestId);
//     }
//
// A null `Uri` means the user backed out of the picker and is forwarded as a
// cancellation. No JNI export lets a panic unwind into the JVM.

#![cfg(target_os = "android")]

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::OnceLock;

use jni::JNIEnv;
use jni::objects::{JClass, JObject, JString, JValue, JValueOwned};
use jni::sys::jstring;

use pickbridge_core::error::{BridgeError, Result};
use pickbridge_core::{PickResult, RequestId};

use crate::correlator::Correlator;
use crate::traits::PlatformUri;

static CORRELATOR: OnceLock<Correlator> = OnceLock::new();

/// Register the correlator the JNI exports deliver into. Only the first call
/// wins.
pub fn install(correlator: Correlator) -> Result<()> {
    CORRELATOR
        .set(correlator)
        .map_err(|_| BridgeError::Config("android bridge already installed".into()))
}

fn installed() -> Result<&'static Correlator> {
    CORRELATOR
        .get()
        .ok_or_else(|| BridgeError::BridgeUnavailable("android bridge not installed".into()))
}

/// Convenience: map any `jni::errors::Error` into `BridgeError::Marshal`.
fn jni_err(context: &str, e: jni::errors::Error) -> BridgeError {
    BridgeError::Marshal(format!("{context}: {e}"))
}

/// Clear a pending Java exception so later JNI calls on this thread work.
fn clear_exception(env: &mut JNIEnv<'_>) {
    if env.exception_check().unwrap_or(false) {
        let _ = env.exception_clear();
    }
}

fn read_request_id(env: &mut JNIEnv<'_>, request_id: &JString<'_>) -> Result<RequestId> {
    if request_id.is_null() {
        return Err(BridgeError::InvalidRequestId("null".into()));
    }
    let raw: String = match env.get_string(request_id) {
        Ok(s) => s.into(),
        Err(e) => {
            clear_exception(env);
            return Err(BridgeError::InvalidRequestId(e.to_string()));
        }
    };
    raw.parse()
}

/// Reject a null object before calling into it.
fn non_null<'local>(obj: JObject<'local>, context: &str) -> Result<JObject<'local>> {
    if obj.is_null() {
        return Err(BridgeError::Marshal(format!("{context}: null object")));
    }
    Ok(obj)
}

/// Chain JNI method calls, stopping at the first failure or null receiver.
trait MethodExt<'local> {
    fn and_method(
        self,
        env: &mut JNIEnv<'local>,
        name: &str,
        sig: &str,
        args: &[JValue<'_, '_>],
    ) -> Result<JValueOwned<'local>>;
}

impl<'local> MethodExt<'local> for Result<JObject<'local>> {
    fn and_method(
        self,
        env: &mut JNIEnv<'local>,
        name: &str,
        sig: &str,
        args: &[JValue<'_, '_>],
    ) -> Result<JValueOwned<'local>> {
        let obj = non_null(self?, name)?;
        env.call_method(&obj, name, sig, args)
            .map_err(|e| jni_err(name, e))
    }
}

// ---------------------------------------------------------------------------
// android.net.Uri marshalling
// ---------------------------------------------------------------------------

/// A non-null `android.net.Uri` together with the env needed to read it.
pub struct JniUri<'a, 'local> {
    env: &'a mut JNIEnv<'local>,
    uri: JObject<'local>,
}

impl PlatformUri for JniUri<'_, '_> {
    /// `Uri.toString()` is the canonical form; it round-trips through
    /// `Uri.parse` on the native side.
    fn into_uri_string(self) -> Result<String> {
        let env = self.env;
        let uri = self.uri;
        let result = (|| -> Result<String> {
            let obj = Ok::<_, BridgeError>(uri)
                .and_method(env, "toString", "()Ljava/lang/String;", &[])?
                .l()
                .map_err(|e| jni_err("Uri.toString->l", e))?;
            let text = JString::from(non_null(obj, "Uri.toString result")?);
            let value: String = env
                .get_string(&text)
                .map_err(|e| jni_err("get_string", e))?
                .into();
            Ok(value)
        })();
        if result.is_err() {
            clear_exception(env);
        }
        result
    }
}

// ---------------------------------------------------------------------------
// JNI exports
// ---------------------------------------------------------------------------

/// `static native String beginNative()`: returns the new request id, or null
/// if the bridge cannot take another request.
#[unsafe(no_mangle)]
pub extern "system" fn Java_net_hyperpolymath_pickbridge_DialogCallback_beginNative<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jstring {
    let started = catch_unwind(AssertUnwindSafe(|| installed()?.begin()));
    let id = match started {
        Ok(Ok(id)) => id,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Android: could not start pick request");
            return std::ptr::null_mut();
        }
        Err(_) => {
            tracing::error!("Android: panic while starting pick request");
            return std::ptr::null_mut();
        }
    };
    match env.new_string(id.to_string()) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            tracing::warn!(error = %e, "Android: could not return request id");
            clear_exception(&mut env);
            // The Java side never learns the id; close the request now.
            if let Ok(correlator) = installed() {
                let _ = correlator.invalidate(id);
            }
            std::ptr::null_mut()
        }
    }
}

/// `static native void onActivityResultNative(String requestId, Uri uri)`.
#[unsafe(no_mangle)]
pub extern "system" fn Java_net_hyperpolymath_pickbridge_DialogCallback_onActivityResultNative<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    request_id: JString<'local>,
    uri: JObject<'local>,
) {
    let outcome = catch_unwind(AssertUnwindSafe(|| -> Result<_> {
        let correlator = installed()?;
        let id = read_request_id(&mut env, &request_id)?;
        let result = if uri.is_null() {
            PickResult::Cancelled
        } else {
            PickResult::Selected(JniUri {
                env: &mut env,
                uri,
            })
        };
        correlator.on_result(id, result)
    }));

    match outcome {
        Ok(Ok(delivery)) => tracing::debug!(?delivery, "Android: picker result handled"),
        Ok(Err(e)) => tracing::warn!(error = %e, "Android: picker result failed"),
        Err(_) => tracing::error!("Android: panic while handling picker result"),
    }
}

/// `static native void invalidateNative(String requestId)`: call when the
/// owning activity is destroyed before a result arrives.
#[unsafe(no_mangle)]
pub extern "system" fn Java_net_hyperpolymath_pickbridge_DialogCallback_invalidateNative<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    request_id: JString<'local>,
) {
    let outcome = catch_unwind(AssertUnwindSafe(|| -> Result<_> {
        let id = read_request_id(&mut env, &request_id)?;
        installed()?.invalidate(id)
    }));

    match outcome {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Android: invalidate failed"),
        Err(_) => tracing::error!("Android: panic while invalidating pick request"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_receiver_is_marshal_error() {
        let err = non_null(JObject::null(), "toString").unwrap_err();
        assert!(matches!(err, BridgeError::Marshal(ref m) if m.contains("toString")));
    }

    #[test]
    fn jni_errors_map_to_marshal() {
        let err = jni_err("Uri.toString", jni::errors::Error::NullPtr("uri"));
        assert!(matches!(err, BridgeError::Marshal(ref m) if m.starts_with("Uri.toString")));
    }
}
