//! Prompt composition for sprite generation

use crate::task::AnimationKind;

const IMAGE_STYLE: &str = "Generate a 2D pixel art sprite character. Style: flat 2D pixel art, \
NOT 3D, NOT photorealistic, NOT rendered. Use pixelated art style with visible pixels. Character \
should be a 2D sprite sheet style character, side view, full body, centered. White solid \
background (not transparent, not checkerboard). No shadows, no 3D effects, no depth, no \
gradients. Pure 2D pixel art sprite style like classic video game sprites. Do NOT add text or UI.";

const VIDEO_STYLE: &str = "\
CRITICAL STYLE REQUIREMENTS - YOU MUST FOLLOW THESE EXACTLY:
- This is a 2D PIXEL ART animation. The input image is a 2D pixel art sprite.
- The clip should be about 4 seconds long so it can be used as a game sprite animation.
- You MUST maintain the EXACT same 2D pixel art style as the input image.
- DO NOT make it 3D, DO NOT make it realistic, DO NOT add depth, DO NOT add shadows.
- DO NOT add lighting, DO NOT add gradients, DO NOT add shine or gloss.
- The character must remain flat 2D pixel art throughout the entire animation.
- Match the pixelated, low-resolution, retro game sprite aesthetic of the input image exactly.
- Use a solid pure white background (#FFFFFF), completely flat, no gradient, no textures, no shadows, no ground line, no objects.
- The character must stay centered, side view, and fill a reasonable portion of the frame.
- No text, UI, logos, borders, or props.
- Keep the same pixel density and resolution as the input image.";

const IDLE_MOTION: &str = "\
ANIMATION TYPE: IDLE
- The character must stand completely still in place.
- Only animate a very subtle breathing motion: tiny up/down movement of the chest.
- Optional: very slight idle sway (left/right) of the body, but minimal.
- NO walking, NO movement across the screen, NO leg movement.
- The animation should be a single seamless idle loop that starts and ends in almost the same pose so it can be looped cleanly.";

const WALK_MOTION: &str = "\
ANIMATION TYPE: WALK CYCLE
- Animate a classic 2D side-scrolling walk cycle in place, side view.
- The character walks on the spot (does NOT move across the screen).
- Show clear leg alternation: left leg forward, right leg back, then switch.
- Arms should swing opposite to legs.
- The character's body should have a slight up/down bounce as they walk.
- The video should contain one clean walk cycle that returns to the starting pose so it can loop seamlessly.
- The character must stay centered in the frame throughout.";

const RUN_MOTION: &str = "\
ANIMATION TYPE: RUN CYCLE
- Animate a faster run cycle in place, side view.
- Legs move faster with longer strides; arms pump more vigorously than walking.
- Body has more pronounced up/down bounce.
- The character stays centered and runs on the spot, like a classic game sprite.
- The clip should be a single, smooth run cycle that ends in nearly the same pose as the first frame for looping.";

const JUMP_MOTION: &str = "\
ANIMATION TYPE: JUMP CYCLE
- Animate a complete jump cycle in place: anticipation (squat down), jump up, hang time at peak, fall down, land, then settle back into the starting pose.
- The landing should have a slight compression/squat.
- The clip should contain one complete jump cycle that ends very close to the initial idle pose.
- NO camera movement, keep the character centered throughout.";

/// Full prompt for an image (preview) task
pub fn image_prompt(user_prompt: Option<&str>) -> String {
    match user_prompt.map(str::trim).filter(|p| !p.is_empty()) {
        Some(prompt) => format!("{}\n\n{}", prompt, IMAGE_STYLE),
        None => IMAGE_STYLE.to_string(),
    }
}

/// Full prompt for a video (animation) task
pub fn animation_prompt(kind: AnimationKind, extra: Option<&str>) -> String {
    let motion = match kind {
        AnimationKind::Idle => IDLE_MOTION,
        AnimationKind::Walk => WALK_MOTION,
        AnimationKind::Run => RUN_MOTION,
        AnimationKind::Jump => JUMP_MOTION,
    };

    let mut sections = vec![VIDEO_STYLE.to_string(), motion.to_string()];
    if let Some(extra) = extra.map(str::trim).filter(|e| !e.is_empty()) {
        sections.push(format!("Additional user instruction: {}", extra));
    }
    sections.join("\n\n")
}
